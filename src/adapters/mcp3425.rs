//! Microchip MCP3425 temperature ADC adapter
//!
//! This adapter implements the [`TempConverter`] port for the MCP3425
//! 16-bit single-channel delta-sigma ADC carrying the Pt1000 bridge.
//!
//! The device has no register map: a single config byte starts a one-shot
//! conversion, and a read returns the two data bytes followed by an echo of
//! the config byte. While the conversion is in progress the echoed RDY bit
//! is still set, which the driver reports as [`ConverterError::NotReady`] -
//! distinct from a bus fault.

use embedded_hal::i2c::I2c;

use crate::ports::{ConverterError, TempConverter};

/// RDY bit: write = start one-shot conversion, read = result not yet updated
const RDY: u8 = 0x80;

/// Conversion resolution, coupled to the output data rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Resolution {
    /// 12 bits at 240 SPS
    Sps240,
    /// 14 bits at 60 SPS
    Sps60,
    /// 16 bits at 15 SPS
    Sps15,
}

impl Resolution {
    const fn bits(self) -> u8 {
        match self {
            Resolution::Sps240 => 0b00,
            Resolution::Sps60 => 0b01,
            Resolution::Sps15 => 0b10,
        }
    }

    /// Code weight in microvolts at PGA x1
    const fn lsb_microvolts(self) -> f32 {
        match self {
            Resolution::Sps240 => 1000.0,
            Resolution::Sps60 => 250.0,
            Resolution::Sps15 => 62.5,
        }
    }

    /// Conversion period plus settling margin, microseconds
    pub const fn conversion_time_us(self) -> u32 {
        match self {
            Resolution::Sps240 => 5_000,
            Resolution::Sps60 => 18_000,
            Resolution::Sps15 => 70_000,
        }
    }
}

/// On-chip programmable gain amplifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Pga {
    X1,
    X2,
    X4,
    X8,
}

impl Pga {
    const fn bits(self) -> u8 {
        match self {
            Pga::X1 => 0b00,
            Pga::X2 => 0b01,
            Pga::X4 => 0b10,
            Pga::X8 => 0b11,
        }
    }

    const fn divisor(self) -> f32 {
        match self {
            Pga::X1 => 1.0,
            Pga::X2 => 2.0,
            Pga::X4 => 4.0,
            Pga::X8 => 8.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DeviceState {
    Idle,
    Converting,
}

/// MCP3425 adapter implementing [`TempConverter`].
pub struct Mcp3425<I2C> {
    i2c: I2C,
    address: u8,
    resolution: Resolution,
    pga: Pga,
    state: DeviceState,
}

struct ReleaseOnDrop<'a> {
    state: &'a mut DeviceState,
}

impl Drop for ReleaseOnDrop<'_> {
    fn drop(&mut self) {
        *self.state = DeviceState::Idle;
    }
}

impl<I2C: I2c> Mcp3425<I2C> {
    /// Factory-programmed address
    pub const DEFAULT_ADDRESS: u8 = 0x68;

    /// Create a new adapter. The AFE's Pt1000 channel runs at 16 bits with
    /// PGA x4.
    pub fn new(i2c: I2C, address: u8, resolution: Resolution, pga: Pga) -> Self {
        Self {
            i2c,
            address,
            resolution,
            pga,
            state: DeviceState::Idle,
        }
    }

    /// Release the underlying I2C bus.
    pub fn free(self) -> I2C {
        self.i2c
    }

    /// One-shot mode config byte, without the RDY trigger
    const fn config_byte(&self) -> u8 {
        (self.resolution.bits() << 2) | self.pga.bits()
    }
}

impl<I2C: I2c> TempConverter for Mcp3425<I2C> {
    type BusError = I2C::Error;

    fn start_conversion(&mut self) -> Result<(), ConverterError<I2C::Error>> {
        if self.state != DeviceState::Idle {
            return Err(ConverterError::Busy);
        }

        self.i2c
            .write(self.address, &[self.config_byte() | RDY])
            .map_err(ConverterError::Bus)?;

        self.state = DeviceState::Converting;
        Ok(())
    }

    fn read_conversion(&mut self) -> Result<f32, ConverterError<I2C::Error>> {
        if self.state != DeviceState::Converting {
            return Err(ConverterError::NotStarted);
        }

        let _release = ReleaseOnDrop {
            state: &mut self.state,
        };

        let mut buf = [0u8; 3];
        self.i2c
            .read(self.address, &mut buf)
            .map_err(ConverterError::Bus)?;

        if buf[2] & RDY != 0 {
            return Err(ConverterError::NotReady);
        }

        let raw = i16::from_be_bytes([buf[0], buf[1]]);
        let microvolts =
            raw as f32 * self.resolution.lsb_microvolts() / self.pga.divisor();

        Ok(microvolts / 1_000_000.0)
    }

    fn conversion_time_us(&self) -> u32 {
        self.resolution.conversion_time_us()
    }

    fn release(&mut self) {
        self.state = DeviceState::Idle;
    }
}
