//! Sampling domain entities
//!
//! This module defines the readings produced by an AFE sampling pass.
//! It has no knowledge of how the underlying conversions are performed.

/// A Pt1000 temperature measurement.
///
/// Carries both the raw converter output (as volts) and the calibrated
/// temperature so that diagnostics and re-calibration can work from the
/// same pass that produced the compensated gas readings.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TemperatureReading {
    /// Raw converter output in volts
    pub volts: f32,
    /// Calibrated temperature in Celsius
    pub temperature_c: f32,
}

/// One working/auxiliary electrode pair, in microvolts.
///
/// Valid only for the instant it was read; never persisted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawSamplePair {
    /// Working-electrode output in microvolts
    pub we_uv: i32,
    /// Auxiliary-electrode output in microvolts
    pub ae_uv: i32,
}

/// A computed gas concentration together with the electrode voltages
/// that produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GasReading {
    /// Working-electrode voltage in volts
    pub we_v: f32,
    /// Auxiliary-electrode voltage in volts
    pub ae_v: f32,
    /// Gas concentration in parts-per-billion
    pub concentration_ppb: f32,
}

/// Why a populated slot failed to produce a concentration this pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SlotError {
    /// The working or auxiliary converter reported a device fault
    Converter,
    /// The cell requires a cross-sensitivity input that was not available
    MissingCorrection,
}

/// Per-slot outcome of a sampling pass.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GasSample {
    /// Gas species name, e.g. "NO2"
    pub gas: &'static str,
    /// Computed reading, or the reason this slot produced none
    pub reading: Result<GasReading, SlotError>,
}

/// Composite result of one AFE sampling pass.
///
/// Exactly one temperature reading, shared by every gas channel sampled in
/// the pass, plus the per-slot results in ascending slot order. Unpopulated
/// slots contribute no entry. Immutable once constructed.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AfeReading {
    /// The Pt1000 reading taken at the start of the pass
    pub temperature: TemperatureReading,
    /// Per-slot results, ascending slot index
    pub gases: heapless::Vec<GasSample, 4>,
}

impl AfeReading {
    /// Look up the result for a gas by species name.
    pub fn gas(&self, name: &str) -> Option<&GasSample> {
        self.gases.iter().find(|sample| sample.gas == name)
    }
}
