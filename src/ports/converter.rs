//! Converter channel ports - abstraction for driving one ADC device
//!
//! Each converter is an exclusive-access resource: a conversion sequence
//! holds an internal device lock from `configure` (or `start_conversion` for
//! the single-channel variant) until `read_conversion` returns, and the lock
//! is released on every exit path, including faults, so a failed read never
//! leaves the device wedged.
//!
//! State machine per device:
//!
//! ```text
//! Idle --configure--> Configured --start_conversion--> Converting
//!  ^                                                       |
//!  +----------------- read_conversion / release -----------+
//! ```

/// Physical input channel of the gas ADC, measured single-ended against
/// ground.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Channel {
    A0,
    A1,
    A2,
    A3,
}

/// Programmable-gain-amplifier setting, named by full-scale range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gain {
    /// +/- 6.144 V
    Fsr6144,
    /// +/- 4.096 V
    Fsr4096,
    /// +/- 2.048 V
    Fsr2048,
    /// +/- 1.024 V
    Fsr1024,
    /// +/- 0.512 V
    Fsr0512,
    /// +/- 0.256 V
    Fsr0256,
}

impl Gain {
    /// Full-scale range in microvolts
    pub const fn fsr_microvolts(self) -> i64 {
        match self {
            Gain::Fsr6144 => 6_144_000,
            Gain::Fsr4096 => 4_096_000,
            Gain::Fsr2048 => 2_048_000,
            Gain::Fsr1024 => 1_024_000,
            Gain::Fsr0512 => 512_000,
            Gain::Fsr0256 => 256_000,
        }
    }
}

/// Converter fault taxonomy.
///
/// `Bus` is a device communication failure; the sequencing variants report
/// misuse of the state machine; `NotReady` means the device answered but the
/// conversion had not completed - distinct from a bus fault so callers can
/// retry a full cycle rather than treat the device as broken.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConverterError<E> {
    /// I2C transaction failed
    Bus(E),
    /// The device lock is already held by an unfinished sequence
    Busy,
    /// `start_conversion` called before `configure`
    NotConfigured,
    /// `read_conversion` called before `start_conversion`
    NotStarted,
    /// The device reports the conversion still in progress
    NotReady,
}

impl<E> From<E> for ConverterError<E> {
    fn from(bus: E) -> Self {
        ConverterError::Bus(bus)
    }
}

/// Port for one channel of a multi-channel gas ADC.
///
/// The caller supplies the conversion wait: after `start_conversion`, wait
/// at least [`conversion_time_us`](GasConverter::conversion_time_us) before
/// `read_conversion`. Keeping the wait outside the port lets the
/// orchestrator start the working and auxiliary converters back to back and
/// block only once for the pair.
pub trait GasConverter {
    /// Bus-level error type of the underlying transport
    type BusError;

    /// Select the input channel and PGA setting for the next conversion.
    /// Acquires the device lock; fails with [`ConverterError::Busy`] while a
    /// previous sequence is unfinished.
    fn configure(&mut self, channel: Channel, gain: Gain)
        -> Result<(), ConverterError<Self::BusError>>;

    /// Begin a single-shot conversion. Returns immediately; the device
    /// converts asynchronously in hardware.
    fn start_conversion(&mut self) -> Result<(), ConverterError<Self::BusError>>;

    /// Read back the conversion result in microvolts, scaled by the
    /// configured PGA setting. Releases the device lock on every exit path.
    fn read_conversion(&mut self) -> Result<i32, ConverterError<Self::BusError>>;

    /// Worst-case conversion time for the configured data rate
    fn conversion_time_us(&self) -> u32;

    /// Force-release the device lock. Idempotent; used by abort paths that
    /// never reached `read_conversion`.
    fn release(&mut self);
}

/// Port for a single-channel one-shot temperature ADC.
///
/// Configure and start collapse into one transaction, as the MCP3425 wire
/// protocol does.
pub trait TempConverter {
    /// Bus-level error type of the underlying transport
    type BusError;

    /// Write the configuration and begin a one-shot conversion. Acquires the
    /// device lock.
    fn start_conversion(&mut self) -> Result<(), ConverterError<Self::BusError>>;

    /// Read back the conversion result in volts. Releases the device lock on
    /// every exit path.
    fn read_conversion(&mut self) -> Result<f32, ConverterError<Self::BusError>>;

    /// Worst-case conversion time for the configured resolution
    fn conversion_time_us(&self) -> u32;

    /// Force-release the device lock. Idempotent.
    fn release(&mut self);
}
