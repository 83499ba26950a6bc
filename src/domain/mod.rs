//! Domain layer - pure business logic independent of infrastructure
//!
//! This module contains the core domain entities and services that
//! represent the gas-sampling logic of the analogue front-end. Nothing
//! in here touches the I2C bus.

pub mod calibration;
pub mod reading;
pub mod sensor;

pub use calibration::{Pt1000Calibration, SensorCalibration, TempCompensation};
pub use reading::{AfeReading, GasReading, GasSample, RawSamplePair, SlotError, TemperatureReading};
pub use sensor::{ComputeError, GasSensor};
