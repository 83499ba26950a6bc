//! Gas sensor strategies
//!
//! One strategy per cell chemistry. Most cells convert their electrode pair
//! straight to a concentration; Ox-type cells also respond to NO2 and must
//! subtract the NO2 concentration measured in the same pass. The orchestrator
//! stays ignorant of the per-species maths and only routes the optional
//! correction input declared by [`GasSensor::cross_sensitivity_dependency`].

use crate::ports::Gain;

use super::calibration::SensorCalibration;
use super::reading::{GasReading, RawSamplePair};

/// Why a strategy could not compute a concentration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ComputeError {
    /// A required cross-sensitivity input was not supplied. Never silently
    /// treated as zero.
    MissingCorrection,
}

impl From<ComputeError> for super::reading::SlotError {
    fn from(error: ComputeError) -> Self {
        match error {
            ComputeError::MissingCorrection => Self::MissingCorrection,
        }
    }
}

/// A single electrochemical cell mounted on one AFE station.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GasSensor {
    /// Generic A4-series cell: concentration is a pure function of its own
    /// electrode pair and the shared temperature.
    Electrochem {
        /// Gas species name, e.g. "NO2", "CO"
        gas: &'static str,
        /// ADS1115 PGA setting this cell is sampled with
        adc_gain: Gain,
        /// Manufacturer calibration coefficients
        calib: SensorCalibration,
    },
    /// Ox-type cell: responds to both O3 and NO2, so the NO2 concentration
    /// measured in the same pass must be subtracted.
    OxCrossSensitive {
        /// Gas species name, normally "Ox"
        gas: &'static str,
        /// ADS1115 PGA setting this cell is sampled with
        adc_gain: Gain,
        /// Manufacturer calibration coefficients, including the NO2
        /// cross-sensitivity term
        calib: SensorCalibration,
    },
}

impl GasSensor {
    /// The species name the Ox-type cell corrects against.
    pub const NO2: &'static str = "NO2";

    /// Generic cell with the default electrode gain.
    pub const fn electrochem(gas: &'static str, calib: SensorCalibration) -> Self {
        Self::Electrochem {
            gas,
            adc_gain: Gain::Fsr2048,
            calib,
        }
    }

    /// Ox-type cell with the default electrode gain.
    pub const fn ox(calib: SensorCalibration) -> Self {
        Self::OxCrossSensitive {
            gas: "Ox",
            adc_gain: Gain::Fsr2048,
            calib,
        }
    }

    /// Same cell, sampled with a non-default PGA setting.
    pub const fn with_gain(self, adc_gain: Gain) -> Self {
        match self {
            Self::Electrochem { gas, calib, .. } => Self::Electrochem {
                gas,
                adc_gain,
                calib,
            },
            Self::OxCrossSensitive { gas, calib, .. } => Self::OxCrossSensitive {
                gas,
                adc_gain,
                calib,
            },
        }
    }

    /// Gas species name
    pub const fn gas_name(&self) -> &'static str {
        match self {
            Self::Electrochem { gas, .. } | Self::OxCrossSensitive { gas, .. } => gas,
        }
    }

    /// PGA setting for this cell's electrode pair
    pub const fn adc_gain(&self) -> Gain {
        match self {
            Self::Electrochem { adc_gain, .. } | Self::OxCrossSensitive { adc_gain, .. } => {
                *adc_gain
            }
        }
    }

    /// The species whose already-computed concentration this cell needs,
    /// if any.
    pub const fn cross_sensitivity_dependency(&self) -> Option<&'static str> {
        match self {
            Self::Electrochem { .. } => None,
            Self::OxCrossSensitive { .. } => Some(Self::NO2),
        }
    }

    /// Convert one electrode pair to a concentration.
    ///
    /// `correction_ppb` is the dependency species' concentration from the
    /// same sampling pass; it is required by the Ox variant and ignored by
    /// the generic variant.
    pub fn compute(
        &self,
        raw: &RawSamplePair,
        temp_c: f32,
        correction_ppb: Option<f32>,
    ) -> Result<GasReading, ComputeError> {
        match self {
            Self::Electrochem { calib, .. } => Ok(Self::reading(
                raw,
                calib.concentration_ppb(raw, temp_c),
            )),
            Self::OxCrossSensitive { calib, .. } => {
                let no2_ppb = correction_ppb.ok_or(ComputeError::MissingCorrection)?;
                let total = calib.concentration_ppb(raw, temp_c);

                Ok(Self::reading(
                    raw,
                    total - no2_ppb * calib.cross_sensitivity_ratio(),
                ))
            }
        }
    }

    fn reading(raw: &RawSamplePair, concentration_ppb: f32) -> GasReading {
        GasReading {
            we_v: raw.we_uv as f32 / 1_000_000.0,
            ae_v: raw.ae_uv as f32 / 1_000_000.0,
            concentration_ppb,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calibration::TempCompensation;
    use assert_approx_eq::assert_approx_eq;

    fn no2_calib() -> SensorCalibration {
        // NO2-A43F style coefficients
        SensorCalibration {
            we_electronic_zero_mv: 295.0,
            ae_electronic_zero_mv: 290.0,
            we_sensitivity_mv_per_ppb: 0.256,
            cross_sensitivity_mv_per_ppb: 0.0,
            temp_comp: TempCompensation::UNITY,
        }
    }

    fn ox_calib() -> SensorCalibration {
        // OX-A431 style coefficients: responds to NO2 at 0.3 mV/ppb
        SensorCalibration {
            we_electronic_zero_mv: 400.0,
            ae_electronic_zero_mv: 395.0,
            we_sensitivity_mv_per_ppb: 0.4,
            cross_sensitivity_mv_per_ppb: 0.3,
            temp_comp: TempCompensation::UNITY,
        }
    }

    #[test]
    fn test_electrochem_reference_concentration() {
        let sensor = GasSensor::electrochem("NO2", no2_calib());
        let raw = RawSamplePair {
            we_uv: 320_000,
            ae_uv: 295_000,
        };

        let reading = sensor.compute(&raw, 20.0, None).unwrap();

        // (25 - 5) mV over the zeros, at 0.256 mV/ppb
        assert_approx_eq!(reading.concentration_ppb, 78.125, 1e-3);
        assert_approx_eq!(reading.we_v, 0.32, 1e-6);
        assert_approx_eq!(reading.ae_v, 0.295, 1e-6);
    }

    #[test]
    fn test_electrochem_ignores_correction_input() {
        let sensor = GasSensor::electrochem("CO", no2_calib());
        let raw = RawSamplePair {
            we_uv: 320_000,
            ae_uv: 295_000,
        };

        let with = sensor.compute(&raw, 20.0, Some(123.0)).unwrap();
        let without = sensor.compute(&raw, 20.0, None).unwrap();
        assert_eq!(with, without);
    }

    #[test]
    fn test_ox_reference_concentration() {
        let sensor = GasSensor::ox(ox_calib());
        let raw = RawSamplePair {
            we_uv: 440_000,
            ae_uv: 400_000,
        };

        // total: (40 - 5) / 0.4 = 87.5 ppb; minus 40 ppb NO2 * 0.75
        let reading = sensor.compute(&raw, 20.0, Some(40.0)).unwrap();
        assert_approx_eq!(reading.concentration_ppb, 57.5, 1e-3);
    }

    #[test]
    fn test_ox_requires_correction() {
        let sensor = GasSensor::ox(ox_calib());
        let raw = RawSamplePair {
            we_uv: 440_000,
            ae_uv: 400_000,
        };

        assert_eq!(
            sensor.compute(&raw, 20.0, None),
            Err(ComputeError::MissingCorrection)
        );
    }

    #[test]
    fn test_temperature_weighting_applies() {
        let mut calib = no2_calib();
        calib.temp_comp = TempCompensation::new([1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0]);
        let sensor = GasSensor::electrochem("NO2", calib);
        let raw = RawSamplePair {
            we_uv: 320_000,
            ae_uv: 295_000,
        };

        // at 30 Celsius the auxiliary electrode is weighted 2.0
        let reading = sensor.compute(&raw, 30.0, None).unwrap();
        assert_approx_eq!(reading.concentration_ppb, (25.0 - 2.0 * 5.0) / 0.256, 1e-3);
    }

    #[test]
    fn test_dependency_declaration() {
        assert_eq!(
            GasSensor::electrochem("NO2", no2_calib()).cross_sensitivity_dependency(),
            None
        );
        assert_eq!(
            GasSensor::ox(ox_calib()).cross_sensitivity_dependency(),
            Some("NO2")
        );
    }
}
