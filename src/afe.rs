//! AFE orchestrator
//!
//! Owns the working-electrode and auxiliary-electrode gas converters, the
//! Pt1000 temperature source and the four sensor slots, and sequences a
//! sampling pass across them.
//!
//! A pass takes one temperature reading shared by every gas channel, then
//! visits the populated slots in ascending index order. Ox-type cells pick
//! up the NO2 concentration computed earlier in the same pass, which is why
//! [`Afe::new`] insists that a cell is mounted after the species it depends
//! on. Converter faults are confined to their slot: the remaining cells
//! still report.

use embedded_hal::delay::DelayNs;
use heapless::Vec;

use crate::domain::{AfeReading, GasReading, GasSample, GasSensor, RawSamplePair, SlotError, TemperatureReading};
use crate::ports::{Channel, Gain, GasConverter, TempConverter};
use crate::pt1000::Pt1000;

/// Number of physical mounting stations on the board
pub const SLOT_COUNT: usize = 4;

/// Station wiring: slot index to ADC input channel
const SLOT_MUX: [Channel; SLOT_COUNT] = [Channel::A3, Channel::A2, Channel::A1, Channel::A0];

/// Slot-configuration faults detected at construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// A cell depends on a species that is not mounted anywhere
    DependencyMissing {
        gas: &'static str,
        depends_on: &'static str,
    },
    /// A cell is mounted at or before the species it depends on, so
    /// `sample_all` could never supply its correction input
    DependencyOrder {
        gas: &'static str,
        depends_on: &'static str,
    },
}

/// Hard failures of a sampling pass.
///
/// Per-slot converter faults are not here: they surface as
/// [`SlotError`](crate::domain::SlotError) markers inside the composite
/// reading.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AfeError {
    /// The temperature converter faulted; a composite reading requires
    /// exactly one temperature
    Temperature,
    /// Station number outside 1..=SLOT_COUNT
    InvalidStation,
}

/// The AFE orchestrator.
///
/// Generic over the two gas-converter ports, the temperature-converter port
/// and the delay provider, so it can run against real ADS1115/MCP3425
/// adapters or against fakes in tests. All access must be externally
/// serialized by the caller; the orchestrator itself is single-threaded.
pub struct Afe<W, A, T, D> {
    wrk: W,
    aux: A,
    pt1000: Pt1000<T>,
    delay: D,
    sensors: [Option<GasSensor>; SLOT_COUNT],
}

impl<W, A, T, D> Afe<W, A, T, D>
where
    W: GasConverter,
    A: GasConverter,
    T: TempConverter,
    D: DelayNs,
{
    /// Create an orchestrator, validating the slot configuration.
    ///
    /// Every cell that declares a cross-sensitivity dependency must have its
    /// dependency species mounted at a strictly lower slot index, otherwise
    /// `sample_all` could never correct it.
    pub fn new(
        wrk: W,
        aux: A,
        pt1000: Pt1000<T>,
        delay: D,
        sensors: [Option<GasSensor>; SLOT_COUNT],
    ) -> Result<Self, ConfigError> {
        Self::validate(&sensors)?;
        Ok(Self::new_unchecked(wrk, aux, pt1000, delay, sensors))
    }

    /// Create an orchestrator without validating dependency ordering.
    ///
    /// An out-of-order cell then degrades per its own contract: it receives
    /// no correction input under [`sample_all`](Afe::sample_all) and reports
    /// [`SlotError::MissingCorrection`].
    pub fn new_unchecked(
        wrk: W,
        aux: A,
        pt1000: Pt1000<T>,
        delay: D,
        sensors: [Option<GasSensor>; SLOT_COUNT],
    ) -> Self {
        Self {
            wrk,
            aux,
            pt1000,
            delay,
            sensors,
        }
    }

    fn validate(sensors: &[Option<GasSensor>; SLOT_COUNT]) -> Result<(), ConfigError> {
        for (index, slot) in sensors.iter().enumerate() {
            let Some(sensor) = slot else { continue };
            let Some(depends_on) = sensor.cross_sensitivity_dependency() else {
                continue;
            };

            let dep_index = sensors
                .iter()
                .position(|other| matches!(other, Some(s) if s.gas_name() == depends_on));

            match dep_index {
                None => {
                    return Err(ConfigError::DependencyMissing {
                        gas: sensor.gas_name(),
                        depends_on,
                    })
                }
                Some(found) if found >= index => {
                    return Err(ConfigError::DependencyOrder {
                        gas: sensor.gas_name(),
                        depends_on,
                    })
                }
                Some(_) => {}
            }
        }

        Ok(())
    }

    /// The configured slots, ascending index (station number = index + 1).
    pub fn sensors(&self) -> &[Option<GasSensor>; SLOT_COUNT] {
        &self.sensors
    }

    /// Sample every populated slot.
    ///
    /// One Pt1000 reading is shared by all slots. Per-slot converter faults
    /// and missing correction inputs are reported as error markers in the
    /// result list; sampling continues best-effort across the remaining
    /// slots.
    pub fn sample_all(&mut self) -> Result<AfeReading, AfeError> {
        self.sample_all_compensated(None)
    }

    /// Like [`sample_all`](Afe::sample_all), but compensate the gas channels
    /// with an externally measured temperature (e.g. an SHT climate sensor)
    /// instead of the Pt1000 value. The Pt1000 reading is still reported.
    pub fn sample_all_compensated(
        &mut self,
        external_temp_c: Option<f32>,
    ) -> Result<AfeReading, AfeError> {
        let temperature = self.sample_temperature()?;
        let temp_c = external_temp_c.unwrap_or(temperature.temperature_c);

        let mut gases: Vec<GasSample, SLOT_COUNT> = Vec::new();

        for index in 0..SLOT_COUNT {
            let Some(sensor) = self.sensors[index] else {
                continue;
            };

            let correction = sensor
                .cross_sensitivity_dependency()
                .and_then(|dep| Self::latest(&gases, dep));

            let reading = self.slot_reading(index, &sensor, temp_c, correction);
            // cannot overflow: at most one entry per slot
            let _ = gases.push(GasSample {
                gas: sensor.gas_name(),
                reading,
            });
        }

        Ok(AfeReading { temperature, gases })
    }

    /// Sample a single station (1-based station number).
    ///
    /// If the station's cell declares a cross-sensitivity dependency, the
    /// dependency species is located among all slots and sampled through its
    /// own converter path first, so no mounting-order restriction applies
    /// here. An unpopulated station yields a reading with an empty gas list.
    pub fn sample_station(&mut self, station: usize) -> Result<AfeReading, AfeError> {
        self.sample_station_compensated(station, None)
    }

    /// Single-station variant of
    /// [`sample_all_compensated`](Afe::sample_all_compensated).
    pub fn sample_station_compensated(
        &mut self,
        station: usize,
        external_temp_c: Option<f32>,
    ) -> Result<AfeReading, AfeError> {
        let index = station
            .checked_sub(1)
            .filter(|&index| index < SLOT_COUNT)
            .ok_or(AfeError::InvalidStation)?;

        let temperature = self.sample_temperature()?;
        let temp_c = external_temp_c.unwrap_or(temperature.temperature_c);

        let mut gases: Vec<GasSample, SLOT_COUNT> = Vec::new();

        if let Some(sensor) = self.sensors[index] {
            let correction = match sensor.cross_sensitivity_dependency() {
                Some(dep) => self.sample_species(dep, temp_c),
                None => None,
            };

            let reading = self.slot_reading(index, &sensor, temp_c, correction);
            let _ = gases.push(GasSample {
                gas: sensor.gas_name(),
                reading,
            });
        }

        Ok(AfeReading { temperature, gases })
    }

    /// One Pt1000 pass on its own.
    pub fn sample_temperature(&mut self) -> Result<TemperatureReading, AfeError> {
        self.pt1000
            .sample(&mut self.delay)
            .map_err(|_| AfeError::Temperature)
    }

    /// Most recently computed concentration for a species among the results
    /// accumulated so far in this pass.
    fn latest(gases: &Vec<GasSample, SLOT_COUNT>, gas: &str) -> Option<f32> {
        gases
            .iter()
            .rev()
            .find(|sample| sample.gas == gas)
            .and_then(|sample| sample.reading.ok())
            .map(|reading| reading.concentration_ppb)
    }

    /// Eagerly sample the named species through its own converter path.
    /// Used by the single-station variant, which has no accumulated results
    /// to draw from.
    fn sample_species(&mut self, gas: &str, temp_c: f32) -> Option<f32> {
        let (index, sensor) = (0..SLOT_COUNT).find_map(|index| {
            self.sensors[index]
                .filter(|sensor| sensor.gas_name() == gas)
                .map(|sensor| (index, sensor))
        })?;

        let raw = self.sample_raw_pair(index, sensor.adc_gain()).ok()?;
        sensor
            .compute(&raw, temp_c, None)
            .ok()
            .map(|reading| reading.concentration_ppb)
    }

    fn slot_reading(
        &mut self,
        index: usize,
        sensor: &GasSensor,
        temp_c: f32,
        correction: Option<f32>,
    ) -> Result<GasReading, SlotError> {
        let raw = self.sample_raw_pair(index, sensor.adc_gain())?;
        sensor.compute(&raw, temp_c, correction).map_err(SlotError::from)
    }

    /// Working and auxiliary sampled in lockstep: configure both, start
    /// both, wait the longer conversion time once, read both. Both devices
    /// are released whatever the outcome, so a fault never leaves either
    /// converter locked.
    fn sample_raw_pair(&mut self, index: usize, gain: Gain) -> Result<RawSamplePair, SlotError> {
        let result = self.raw_pair_sequence(index, gain);
        self.wrk.release();
        self.aux.release();

        #[cfg(feature = "defmt")]
        if result.is_err() {
            defmt::warn!("AFE: converter fault at station {}", index + 1);
        }

        result
    }

    fn raw_pair_sequence(&mut self, index: usize, gain: Gain) -> Result<RawSamplePair, SlotError> {
        let channel = SLOT_MUX[index];

        self.wrk
            .configure(channel, gain)
            .map_err(|_| SlotError::Converter)?;
        self.aux
            .configure(channel, gain)
            .map_err(|_| SlotError::Converter)?;

        self.wrk
            .start_conversion()
            .map_err(|_| SlotError::Converter)?;
        self.aux
            .start_conversion()
            .map_err(|_| SlotError::Converter)?;

        let tconv = self
            .wrk
            .conversion_time_us()
            .max(self.aux.conversion_time_us());
        self.delay.delay_us(tconv);

        let we_uv = self
            .wrk
            .read_conversion()
            .map_err(|_| SlotError::Converter)?;
        let ae_uv = self
            .aux
            .read_conversion()
            .map_err(|_| SlotError::Converter)?;

        Ok(RawSamplePair { we_uv, ae_uv })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::calibration::{Pt1000Calibration, SensorCalibration, TempCompensation};
    use crate::ports::ConverterError;
    use assert_approx_eq::assert_approx_eq;
    use embedded_hal_mock::eh1::delay::NoopDelay;

    /// Scripted gas converter: returns `values` in read order, faulting at
    /// the read indices listed in `fail_reads` (the value at a failed index
    /// is a placeholder). Mirrors the port's lock discipline.
    #[derive(Default)]
    struct FakeGas {
        values: std::vec::Vec<i32>,
        cursor: usize,
        fail_reads: std::vec::Vec<usize>,
        locked: bool,
        started: bool,
    }

    impl FakeGas {
        fn with_values(values: &[i32]) -> Self {
            Self {
                values: values.to_vec(),
                ..Self::default()
            }
        }

        fn failing_at(mut self, reads: &[usize]) -> Self {
            self.fail_reads = reads.to_vec();
            self
        }
    }

    impl GasConverter for FakeGas {
        type BusError = ();

        fn configure(&mut self, _: Channel, _: Gain) -> Result<(), ConverterError<()>> {
            if self.locked {
                return Err(ConverterError::Busy);
            }
            self.locked = true;
            Ok(())
        }

        fn start_conversion(&mut self) -> Result<(), ConverterError<()>> {
            if !self.locked {
                return Err(ConverterError::NotConfigured);
            }
            self.started = true;
            Ok(())
        }

        fn read_conversion(&mut self) -> Result<i32, ConverterError<()>> {
            if !self.started {
                return Err(ConverterError::NotStarted);
            }
            self.locked = false;
            self.started = false;

            let index = self.cursor;
            self.cursor += 1;

            if self.fail_reads.contains(&index) {
                return Err(ConverterError::Bus(()));
            }
            Ok(self.values[index])
        }

        fn conversion_time_us(&self) -> u32 {
            145_000
        }

        fn release(&mut self) {
            self.locked = false;
            self.started = false;
        }
    }

    struct FakeTemp {
        volts: f32,
        fail: bool,
        locked: bool,
    }

    impl FakeTemp {
        fn at_20c() -> Self {
            Self {
                volts: Pt1000Calibration::DEFAULT_V20,
                fail: false,
                locked: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::at_20c()
            }
        }
    }

    impl TempConverter for FakeTemp {
        type BusError = ();

        fn start_conversion(&mut self) -> Result<(), ConverterError<()>> {
            if self.locked {
                return Err(ConverterError::Busy);
            }
            self.locked = true;
            Ok(())
        }

        fn read_conversion(&mut self) -> Result<f32, ConverterError<()>> {
            self.locked = false;
            if self.fail {
                return Err(ConverterError::Bus(()));
            }
            Ok(self.volts)
        }

        fn conversion_time_us(&self) -> u32 {
            70_000
        }

        fn release(&mut self) {
            self.locked = false;
        }
    }

    fn calib(sens_mv_per_ppb: f32, cross_mv_per_ppb: f32) -> SensorCalibration {
        SensorCalibration {
            we_electronic_zero_mv: 0.0,
            ae_electronic_zero_mv: 0.0,
            we_sensitivity_mv_per_ppb: sens_mv_per_ppb,
            cross_sensitivity_mv_per_ppb: cross_mv_per_ppb,
            temp_comp: TempCompensation::UNITY,
        }
    }

    fn afe_with(
        sensors: [Option<GasSensor>; SLOT_COUNT],
        wrk: FakeGas,
        aux: FakeGas,
    ) -> Afe<FakeGas, FakeGas, FakeTemp, NoopDelay> {
        Afe::new_unchecked(
            wrk,
            aux,
            Pt1000::new(FakeTemp::at_20c(), Pt1000Calibration::default()),
            NoopDelay,
            sensors,
        )
    }

    fn concentration(reading: &AfeReading, gas: &str) -> f32 {
        reading
            .gas(gas)
            .unwrap()
            .reading
            .unwrap()
            .concentration_ppb
    }

    #[test]
    fn test_empty_slots_yield_temperature_only() {
        let mut afe = afe_with(
            [None, None, None, None],
            FakeGas::default(),
            FakeGas::default(),
        );

        let reading = afe.sample_all().unwrap();
        assert!(reading.gases.is_empty());
        assert_approx_eq!(reading.temperature.temperature_c, 20.0, 1e-3);
    }

    #[test]
    fn test_slots_sampled_in_ascending_order() {
        let sensors = [
            Some(GasSensor::electrochem("NO2", calib(1.0, 0.0))),
            Some(GasSensor::electrochem("CO", calib(1.0, 0.0))),
            Some(GasSensor::electrochem("SO2", calib(1.0, 0.0))),
            None,
        ];
        let mut afe = afe_with(
            sensors,
            FakeGas::with_values(&[300_000, 400_000, 500_000]),
            FakeGas::with_values(&[100_000, 100_000, 100_000]),
        );

        let reading = afe.sample_all().unwrap();
        let names: std::vec::Vec<&str> = reading.gases.iter().map(|s| s.gas).collect();
        assert_eq!(names, ["NO2", "CO", "SO2"]);

        assert_approx_eq!(concentration(&reading, "NO2"), 200.0, 1e-3);
        assert_approx_eq!(concentration(&reading, "CO"), 300.0, 1e-3);
        assert_approx_eq!(concentration(&reading, "SO2"), 400.0, 1e-3);
    }

    #[test]
    fn test_ox_receives_no2_correction_in_order() {
        let sensors = [
            Some(GasSensor::electrochem("NO2", calib(1.0, 0.0))),
            Some(GasSensor::ox(calib(1.0, 0.5))),
            None,
            None,
        ];
        let mut afe = Afe::new(
            FakeGas::with_values(&[300_000, 250_000]),
            FakeGas::with_values(&[100_000, 50_000]),
            Pt1000::new(FakeTemp::at_20c(), Pt1000Calibration::default()),
            NoopDelay,
            sensors,
        )
        .unwrap();

        let reading = afe.sample_all().unwrap();

        // NO2: 200 ppb; Ox: 200 ppb total minus 200 * 0.5
        assert_approx_eq!(concentration(&reading, "NO2"), 200.0, 1e-3);
        assert_approx_eq!(concentration(&reading, "Ox"), 100.0, 1e-3);
    }

    #[test]
    fn test_out_of_order_ox_degrades_explicitly() {
        let sensors = [
            Some(GasSensor::ox(calib(1.0, 0.5))),
            Some(GasSensor::electrochem("NO2", calib(1.0, 0.0))),
            None,
            None,
        ];
        let mut afe = afe_with(
            sensors,
            FakeGas::with_values(&[250_000, 300_000]),
            FakeGas::with_values(&[50_000, 100_000]),
        );

        let reading = afe.sample_all().unwrap();

        assert_eq!(
            reading.gas("Ox").unwrap().reading,
            Err(SlotError::MissingCorrection)
        );
        assert_approx_eq!(concentration(&reading, "NO2"), 200.0, 1e-3);
    }

    #[test]
    fn test_sample_station_resolves_dependency_eagerly() {
        // Ox mounted BEFORE NO2: sample_all cannot correct it, but the
        // single-station path samples NO2 through its own converter first.
        let sensors = [
            Some(GasSensor::ox(calib(1.0, 0.5))),
            Some(GasSensor::electrochem("NO2", calib(1.0, 0.0))),
            None,
            None,
        ];
        let mut afe = afe_with(
            sensors,
            // read order: NO2 first (eager dependency), then Ox
            FakeGas::with_values(&[300_000, 250_000]),
            FakeGas::with_values(&[100_000, 50_000]),
        );

        let reading = afe.sample_station(1).unwrap();

        assert_eq!(reading.gases.len(), 1);
        assert_approx_eq!(concentration(&reading, "Ox"), 100.0, 1e-3);
    }

    #[test]
    fn test_sample_station_unpopulated_and_out_of_range() {
        let mut afe = afe_with(
            [
                Some(GasSensor::electrochem("NO2", calib(1.0, 0.0))),
                None,
                None,
                None,
            ],
            FakeGas::default(),
            FakeGas::default(),
        );

        let reading = afe.sample_station(2).unwrap();
        assert!(reading.gases.is_empty());

        assert_eq!(afe.sample_station(0), Err(AfeError::InvalidStation));
        assert_eq!(afe.sample_station(5), Err(AfeError::InvalidStation));
    }

    #[test]
    fn test_converter_fault_is_confined_to_its_slot() {
        let sensors = [
            Some(GasSensor::electrochem("NO2", calib(1.0, 0.0))),
            Some(GasSensor::electrochem("CO", calib(1.0, 0.0))),
            Some(GasSensor::electrochem("SO2", calib(1.0, 0.0))),
            None,
        ];
        let mut afe = afe_with(
            sensors,
            // slot 0 faults on read; its value is a placeholder
            FakeGas::with_values(&[0, 400_000, 500_000]).failing_at(&[0]),
            // the auxiliary read of slot 0 is never reached
            FakeGas::with_values(&[100_000, 100_000]),
        );

        let reading = afe.sample_all().unwrap();

        assert_eq!(
            reading.gas("NO2").unwrap().reading,
            Err(SlotError::Converter)
        );
        assert_approx_eq!(concentration(&reading, "CO"), 300.0, 1e-3);
        assert_approx_eq!(concentration(&reading, "SO2"), 400.0, 1e-3);

        // locks observably released after the fault
        assert!(!afe.wrk.locked);
        assert!(!afe.aux.locked);
    }

    #[test]
    fn test_external_temperature_compensates_without_replacing_pt1000() {
        // auxiliary weighting doubles at 30 Celsius
        let mut cell = calib(1.0, 0.0);
        cell.temp_comp = TempCompensation::new([1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0]);

        let sensors = [
            Some(GasSensor::electrochem("NO2", cell)),
            None,
            None,
            None,
        ];
        let mut afe = afe_with(
            sensors,
            FakeGas::with_values(&[300_000]),
            FakeGas::with_values(&[100_000]),
        );

        let reading = afe.sample_all_compensated(Some(30.0)).unwrap();

        // compensated at 30 C: 300 - 2 * 100
        assert_approx_eq!(concentration(&reading, "NO2"), 100.0, 1e-3);
        // but the Pt1000 reading itself is still reported
        assert_approx_eq!(reading.temperature.temperature_c, 20.0, 1e-3);
    }

    #[test]
    fn test_temperature_fault_is_hard_error() {
        let mut afe = Afe::new_unchecked(
            FakeGas::default(),
            FakeGas::default(),
            Pt1000::new(FakeTemp::failing(), Pt1000Calibration::default()),
            NoopDelay,
            [None, None, None, None],
        );

        assert_eq!(afe.sample_all(), Err(AfeError::Temperature));
    }

    #[test]
    fn test_constructor_validates_dependency_order() {
        let ox_first = [
            Some(GasSensor::ox(calib(1.0, 0.5))),
            Some(GasSensor::electrochem("NO2", calib(1.0, 0.0))),
            None,
            None,
        ];
        let result = Afe::new(
            FakeGas::default(),
            FakeGas::default(),
            Pt1000::new(FakeTemp::at_20c(), Pt1000Calibration::default()),
            NoopDelay,
            ox_first,
        );
        assert_eq!(
            result.err(),
            Some(ConfigError::DependencyOrder {
                gas: "Ox",
                depends_on: "NO2"
            })
        );

        let ox_alone = [Some(GasSensor::ox(calib(1.0, 0.5))), None, None, None];
        let result = Afe::new(
            FakeGas::default(),
            FakeGas::default(),
            Pt1000::new(FakeTemp::at_20c(), Pt1000Calibration::default()),
            NoopDelay,
            ox_alone,
        );
        assert_eq!(
            result.err(),
            Some(ConfigError::DependencyMissing {
                gas: "Ox",
                depends_on: "NO2"
            })
        );
    }
}
