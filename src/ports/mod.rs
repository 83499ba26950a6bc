//! Ports (interfaces) defining the boundaries of the application
//!
//! Ports are traits that define how the orchestrator drives its converter
//! devices. They allow the sampling logic to remain independent of specific
//! implementations.
//!
//! # Hexagonal Architecture
//!
//! In hexagonal architecture, ports define the "holes" in the hexagon where
//! adapters plug in:
//!
//! - **GasConverter**: one channel of a multi-channel gas ADC (ADS1115, mock)
//! - **TempConverter**: a one-shot temperature ADC (MCP3425, mock)

pub mod converter;

pub use converter::{Channel, ConverterError, Gain, GasConverter, TempConverter};
