//! Pt1000 temperature source
//!
//! Wraps a [`TempConverter`] port and a [`Pt1000Calibration`] to produce the
//! calibrated board temperature that compensates every gas channel of a
//! sampling pass.

use embedded_hal::delay::DelayNs;

use crate::domain::{Pt1000Calibration, TemperatureReading};
use crate::ports::{ConverterError, TempConverter};

/// Pt1000 temperature source.
///
/// Owns its converter for the lifetime of the AFE. Stateless across calls
/// apart from the converter's own device lock.
pub struct Pt1000<T> {
    adc: T,
    calibration: Pt1000Calibration,
}

impl<T: TempConverter> Pt1000<T> {
    /// Create a new temperature source.
    pub fn new(adc: T, calibration: Pt1000Calibration) -> Self {
        Self { adc, calibration }
    }

    /// Get current calibration
    pub fn calibration(&self) -> Pt1000Calibration {
        self.calibration
    }

    /// Update calibration parameters
    pub fn set_calibration(&mut self, calibration: Pt1000Calibration) {
        self.calibration = calibration;
    }

    /// Drive one full start/wait/read cycle and apply the calibration.
    ///
    /// The converter is released whatever the outcome.
    pub fn sample<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<TemperatureReading, ConverterError<T::BusError>> {
        let result = self.sample_cycle(delay);
        self.adc.release();
        result
    }

    fn sample_cycle<D: DelayNs>(
        &mut self,
        delay: &mut D,
    ) -> Result<TemperatureReading, ConverterError<T::BusError>> {
        self.adc.start_conversion()?;
        delay.delay_us(self.adc.conversion_time_us());
        let volts = self.adc.read_conversion()?;

        Ok(TemperatureReading {
            volts,
            temperature_c: self.calibration.temperature(volts),
        })
    }
}
