//! TI ADS1115 gas ADC adapter
//!
//! This adapter implements the [`GasConverter`] port for the TI ADS1115
//! 16-bit 4-channel ADC. An AFE carries two of them at distinct addresses:
//! one for the working electrodes, one for the auxiliary electrodes.
//!
//! The driver holds an internal device lock from `configure` until
//! `read_conversion` returns; the release in `read_conversion` is a drop
//! guard, so the lock clears on every exit path.

use embedded_hal::i2c::I2c;

use crate::ports::{Channel, ConverterError, Gain, GasConverter};

/// Conversion result register
const REG_CONVERSION: u8 = 0x00;
/// Configuration register
const REG_CONFIG: u8 = 0x01;

/// OS bit: begin a single conversion
const OS_START: u16 = 0x8000;
/// MODE bit: single-shot
const MODE_SINGLE_SHOT: u16 = 0x0100;
/// COMP_QUE = 11: comparator disabled
const COMP_QUE_DISABLE: u16 = 0x0003;

/// Output data rate, which fixes the conversion time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataRate {
    Sps8,
    Sps16,
    Sps32,
    Sps64,
    Sps128,
    Sps250,
    Sps475,
    Sps860,
}

impl DataRate {
    const fn bits(self) -> u16 {
        match self {
            DataRate::Sps8 => 0b000,
            DataRate::Sps16 => 0b001,
            DataRate::Sps32 => 0b010,
            DataRate::Sps64 => 0b011,
            DataRate::Sps128 => 0b100,
            DataRate::Sps250 => 0b101,
            DataRate::Sps475 => 0b110,
            DataRate::Sps860 => 0b111,
        }
    }

    /// Conversion period plus settling margin, microseconds
    pub const fn conversion_time_us(self) -> u32 {
        match self {
            DataRate::Sps8 => 145_000,
            DataRate::Sps16 => 73_000,
            DataRate::Sps32 => 37_000,
            DataRate::Sps64 => 19_000,
            DataRate::Sps128 => 10_000,
            DataRate::Sps250 => 4_600,
            DataRate::Sps475 => 2_700,
            DataRate::Sps860 => 1_700,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeviceState {
    Idle,
    Configured,
    Converting,
}

/// ADS1115 adapter implementing [`GasConverter`].
pub struct Ads1115<I2C> {
    i2c: I2C,
    address: u8,
    rate: DataRate,
    state: DeviceState,
    active: Option<(Channel, Gain)>,
}

/// Clears the device lock when the enclosing scope exits, fault or not.
struct ReleaseOnDrop<'a> {
    state: &'a mut DeviceState,
    active: &'a mut Option<(Channel, Gain)>,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        *self.state = DeviceState::Idle;
        *self.active = None;
    }
}

impl<I2C: I2c> Ads1115<I2C> {
    /// Conventional address of the working-electrode converter
    pub const ADDR_WRK: u8 = 0x48;
    /// Conventional address of the auxiliary-electrode converter
    pub const ADDR_AUX: u8 = 0x49;

    /// Create a new adapter at the given address and data rate.
    pub fn new(i2c: I2C, address: u8, rate: DataRate) -> Self {
        Self {
            i2c,
            address,
            rate,
            state: DeviceState::Idle,
            active: None,
        }
    }

    /// Release the underlying I2C bus.
    pub fn free(self) -> I2C {
        self.i2c
    }

    fn config_word(&self, channel: Channel, gain: Gain, start: bool) -> u16 {
        let mut word = MODE_SINGLE_SHOT | COMP_QUE_DISABLE;
        word |= (Self::mux_bits(channel)) << 12;
        word |= (Self::pga_bits(gain)) << 9;
        word |= self.rate.bits() << 5;

        if start {
            word |= OS_START;
        }

        word
    }

    /// Single-ended MUX encoding: AINx against GND
    const fn mux_bits(channel: Channel) -> u16 {
        match channel {
            Channel::A0 => 0b100,
            Channel::A1 => 0b101,
            Channel::A2 => 0b110,
            Channel::A3 => 0b111,
        }
    }

    const fn pga_bits(gain: Gain) -> u16 {
        match gain {
            Gain::Fsr6144 => 0b000,
            Gain::Fsr4096 => 0b001,
            Gain::Fsr2048 => 0b010,
            Gain::Fsr1024 => 0b011,
            Gain::Fsr0512 => 0b100,
            Gain::Fsr0256 => 0b101,
        }
    }

    fn write_config(&mut self, word: u16) -> Result<(), I2C::Error> {
        let bytes = word.to_be_bytes();
        self.i2c
            .write(self.address, &[REG_CONFIG, bytes[0], bytes[1]])
    }
}

impl<I2C: I2c> GasConverter for Ads1115<I2C> {
    type BusError = I2C::Error;

    fn configure(
        &mut self,
        channel: Channel,
        gain: Gain,
    ) -> Result<(), ConverterError<I2C::Error>> {
        if self.state != DeviceState::Idle {
            return Err(ConverterError::Busy);
        }

        let word = self.config_word(channel, gain, false);
        self.write_config(word).map_err(ConverterError::Bus)?;

        self.active = Some((channel, gain));
        self.state = DeviceState::Configured;
        Ok(())
    }

    fn start_conversion(&mut self) -> Result<(), ConverterError<I2C::Error>> {
        let (channel, gain) = match self.state {
            DeviceState::Configured => self.active.ok_or(ConverterError::NotConfigured)?,
            DeviceState::Idle => return Err(ConverterError::NotConfigured),
            DeviceState::Converting => return Err(ConverterError::Busy),
        };

        let word = self.config_word(channel, gain, true);
        self.write_config(word).map_err(ConverterError::Bus)?;

        self.state = DeviceState::Converting;
        Ok(())
    }

    fn read_conversion(&mut self) -> Result<i32, ConverterError<I2C::Error>> {
        if self.state != DeviceState::Converting {
            return Err(ConverterError::NotStarted);
        }
        let (_, gain) = self.active.ok_or(ConverterError::NotStarted)?;

        let _release = ReleaseOnDrop {
            state: &mut self.state,
            active: &mut self.active,
        };

        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[REG_CONVERSION], &mut buf)
            .map_err(ConverterError::Bus)?;

        let raw = i16::from_be_bytes(buf);
        Ok((raw as i64 * gain.fsr_microvolts() / 32_768) as i32)
    }

    fn conversion_time_us(&self) -> u32 {
        self.rate.conversion_time_us()
    }

    fn release(&mut self) {
        self.state = DeviceState::Idle;
        self.active = None;
    }
}
