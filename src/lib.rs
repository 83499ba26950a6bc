//! Alphasense Analogue Front-End (AFE) driver
//!
//! This library provides a hexagonal architecture for sampling an Alphasense
//! analogue front-end: two TI ADS1115 ADCs carrying the working and auxiliary
//! electrodes of up to four electrochemical gas cells, and a Microchip MCP3425
//! ADC carrying a Pt1000 temperature sensor.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Domain Layer                                 │
//! │  - AfeReading / GasReading / TemperatureReading entities         │
//! │  - GasSensor strategies (generic cell, Ox with NO2 correction)   │
//! │  - Pt1000 / per-cell calibration services                        │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Ports (Traits)                               │
//! │  - GasConverter: configure/start/read one gas-ADC channel        │
//! │  - TempConverter: one-shot temperature-ADC conversion            │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters                                     │
//! │  - Ads1115: 4-channel gas ADC via I2C                            │
//! │  - Mcp3425: single-channel temperature ADC via I2C               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The [`Afe`] orchestrator owns one working-electrode converter, one
//! auxiliary-electrode converter and one [`Pt1000`] temperature source, plus
//! four sensor slots. A sampling pass takes a single temperature reading,
//! then drives each populated slot in ascending order and resolves the NO2
//! cross-sensitivity input for Ox-type cells from the results already
//! computed in the same pass.
//!
//! # Key Benefits
//!
//! - **Testable** - Ports allow driving the orchestrator against fake or
//!   mocked converters, no hardware required
//! - **No global device state** - Bus addresses, rates and gains are injected
//!   at construction, so several instances can coexist
//! - **Best-effort sampling** - A faulted cell is reported as an error marker
//!   without blocking the remaining cells

#![cfg_attr(not(test), no_std)]

/// Domain layer - pure business logic
pub mod domain;

/// Ports - traits defining boundaries
pub mod ports;

/// Adapters - concrete implementations
pub mod adapters;

/// AFE orchestrator
pub mod afe;

/// Pt1000 temperature source
pub mod pt1000;

// Re-export key domain types
pub use domain::{
    AfeReading, ComputeError, GasReading, GasSample, GasSensor, Pt1000Calibration, RawSamplePair,
    SensorCalibration, SlotError, TempCompensation, TemperatureReading,
};

// Re-export key port traits and value types
pub use ports::{Channel, ConverterError, Gain, GasConverter, TempConverter};

// Re-export adapters
pub use adapters::{Ads1115, DataRate, Mcp3425, Pga, Resolution};

// Re-export the orchestrator and temperature source
pub use afe::{Afe, AfeError, ConfigError, SLOT_COUNT};
pub use pt1000::Pt1000;
