//! Adapters - concrete implementations of ports
//!
//! Adapters connect the sampling logic to real hardware by implementing
//! the port traits over `embedded_hal::i2c::I2c`.
//!
//! # Available Adapters
//!
//! - **ads1115**: TI ADS1115 16-bit 4-channel ADC (working/auxiliary
//!   electrodes) via I2C
//! - **mcp3425**: Microchip MCP3425 16-bit single-channel ADC (Pt1000
//!   temperature) via I2C

pub mod ads1115;
pub mod mcp3425;

pub use ads1115::{Ads1115, DataRate};
pub use mcp3425::{Mcp3425, Pga, Resolution};
