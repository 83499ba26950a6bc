//! Calibration domain services
//!
//! Converts raw converter outputs to calibrated temperatures and gas
//! concentrations. Coefficients are supplied at construction time by the
//! host's calibration store and are read-only thereafter.

use super::reading::RawSamplePair;

/// Pt1000 linear calibration around the 20 degree point.
///
/// The AFE drives the Pt1000 through a fixed current source, so the sensed
/// voltage rises linearly with temperature:
/// `temperature = 20 + (v - v20) / 400e-6`
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Pt1000Calibration {
    /// Sensed voltage at 20 Celsius
    pub v20: f32,
}

impl Pt1000Calibration {
    /// Nominal voltage at 20 Celsius for an uncalibrated board
    pub const DEFAULT_V20: f32 = 0.295;

    /// Sensed-voltage slope, volts per Celsius
    const VOLTS_PER_CENTIGRADE: f32 = 0.000_400;

    /// Create a calibration from a known 20 Celsius voltage
    pub const fn new(v20: f32) -> Self {
        Self { v20 }
    }

    /// Convert a sensed voltage to temperature in Celsius
    #[inline]
    pub fn temperature(&self, volts: f32) -> f32 {
        20.0 + (volts - self.v20) / Self::VOLTS_PER_CENTIGRADE
    }

    /// The voltage this calibration expects at 20 Celsius given a reading
    /// taken at a known reference temperature. Used when re-calibrating a
    /// board against an external thermometer.
    pub fn v20_at(volts: f32, reference_temp_c: f32) -> f32 {
        volts - (reference_temp_c - 20.0) * Self::VOLTS_PER_CENTIGRADE
    }
}

impl Default for Pt1000Calibration {
    fn default() -> Self {
        Self::new(Self::DEFAULT_V20)
    }
}

/// Temperature-dependent auxiliary-electrode weighting.
///
/// Electrochemical cells drift with temperature; the manufacturer publishes
/// a per-species factor n_T applied to the auxiliary electrode before it is
/// subtracted from the working electrode. The table covers -30 to +50
/// Celsius in 10 degree steps and is interpolated linearly, clamped at the
/// ends.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TempCompensation {
    factors: [f32; 9],
}

impl TempCompensation {
    const MIN_TEMP_C: f32 = -30.0;
    const STEP_C: f32 = 10.0;

    /// No compensation: the auxiliary electrode is subtracted as-is
    pub const UNITY: Self = Self { factors: [1.0; 9] };

    /// Create from a -30..=50 Celsius factor table
    pub const fn new(factors: [f32; 9]) -> Self {
        Self { factors }
    }

    /// Interpolated weighting factor at the given temperature
    pub fn factor(&self, temp_c: f32) -> f32 {
        if temp_c <= Self::MIN_TEMP_C {
            return self.factors[0];
        }

        let position = (temp_c - Self::MIN_TEMP_C) / Self::STEP_C;
        let index = position as usize;

        if index >= self.factors.len() - 1 {
            return self.factors[self.factors.len() - 1];
        }

        let fraction = position - index as f32;
        self.factors[index] + (self.factors[index + 1] - self.factors[index]) * fraction
    }
}

impl Default for TempCompensation {
    fn default() -> Self {
        Self::UNITY
    }
}

/// Per-cell transfer-function coefficients from the manufacturer's
/// calibration sheet.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorCalibration {
    /// Working-electrode electronic zero, millivolts
    pub we_electronic_zero_mv: f32,
    /// Auxiliary-electrode electronic zero, millivolts
    pub ae_electronic_zero_mv: f32,
    /// Working-electrode sensitivity, millivolts per ppb
    pub we_sensitivity_mv_per_ppb: f32,
    /// NO2 cross-sensitivity, millivolts per ppb of NO2 (zero for cells
    /// without a cross-sensitivity term)
    pub cross_sensitivity_mv_per_ppb: f32,
    /// Auxiliary-electrode temperature weighting
    pub temp_comp: TempCompensation,
}

impl SensorCalibration {
    /// Temperature-compensated working-electrode voltage, millivolts.
    ///
    /// Subtracts the electronic zeros and the n_T-weighted auxiliary
    /// electrode from the working electrode.
    pub fn corrected_we_mv(&self, raw: &RawSamplePair, temp_c: f32) -> f32 {
        let we_mv = raw.we_uv as f32 / 1000.0 - self.we_electronic_zero_mv;
        let ae_mv = raw.ae_uv as f32 / 1000.0 - self.ae_electronic_zero_mv;

        we_mv - self.temp_comp.factor(temp_c) * ae_mv
    }

    /// Uncorrected concentration in ppb (before any cross-sensitivity term)
    pub fn concentration_ppb(&self, raw: &RawSamplePair, temp_c: f32) -> f32 {
        self.corrected_we_mv(raw, temp_c) / self.we_sensitivity_mv_per_ppb
    }

    /// Concentration of the interfering species, expressed in ppb of this
    /// cell's output, per ppb of the interferent.
    pub fn cross_sensitivity_ratio(&self) -> f32 {
        self.cross_sensitivity_mv_per_ppb / self.we_sensitivity_mv_per_ppb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_pt1000_at_v20() {
        let cal = Pt1000Calibration::default();
        assert_approx_eq!(cal.temperature(0.295), 20.0, 1e-4);
    }

    #[test]
    fn test_pt1000_slope() {
        let cal = Pt1000Calibration::new(0.295);
        // +4.4 mV over v20 is +11 Celsius
        assert_approx_eq!(cal.temperature(0.2994), 31.0, 1e-3);
        assert_approx_eq!(cal.temperature(0.2910), 10.0, 1e-3);
    }

    #[test]
    fn test_pt1000_recalibration_round_trip() {
        let v20 = Pt1000Calibration::v20_at(0.3010, 35.0);
        let cal = Pt1000Calibration::new(v20);
        assert_approx_eq!(cal.temperature(0.3010), 35.0, 1e-3);
    }

    #[test]
    fn test_temp_comp_interpolates() {
        let comp = TempCompensation::new([0.2, 0.4, 0.6, 0.8, 1.0, 1.2, 1.4, 1.6, 1.8]);
        // midpoint between the 20 and 30 Celsius entries
        assert_approx_eq!(comp.factor(25.0), 1.3, 1e-5);
        // exact table point
        assert_approx_eq!(comp.factor(-20.0), 0.4, 1e-5);
    }

    #[test]
    fn test_temp_comp_clamps() {
        let comp = TempCompensation::new([0.2, 0.4, 0.6, 0.8, 1.0, 1.2, 1.4, 1.6, 1.8]);
        assert_approx_eq!(comp.factor(-45.0), 0.2, 1e-5);
        assert_approx_eq!(comp.factor(80.0), 1.8, 1e-5);
    }

    #[test]
    fn test_corrected_we() {
        let cal = SensorCalibration {
            we_electronic_zero_mv: 295.0,
            ae_electronic_zero_mv: 290.0,
            we_sensitivity_mv_per_ppb: 0.5,
            cross_sensitivity_mv_per_ppb: 0.0,
            temp_comp: TempCompensation::UNITY,
        };
        let raw = RawSamplePair {
            we_uv: 320_000,
            ae_uv: 295_000,
        };
        // we 25 mV over zero, ae 5 mV over zero, unity weighting
        assert_approx_eq!(cal.corrected_we_mv(&raw, 20.0), 20.0, 1e-4);
        assert_approx_eq!(cal.concentration_ppb(&raw, 20.0), 40.0, 1e-3);
    }
}
