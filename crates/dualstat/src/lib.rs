//! Dualstat - valve + fan thermostat strategy
//!
//! Drives a position valve and a variable speed fan from a single demand
//! signal:
//! - `position`: demand to valve position / fan speed mapping
//! - `commander`: best-effort valve and fan service calls
//! - `strategy`: the `Actuator` the lifecycle controller turns on and off
//! - `device`: lifecycle + strategy composed into one thermostat device
//! - `power`: temperature error to demand percentage
//! - `environment`: temperatures, setpoints and tolerances
//! - `config`: layered TOML / environment configuration

pub use hvac_runtime;

pub mod commander;
pub mod config;
pub mod device;
pub mod environment;
pub mod position;
pub mod power;
pub mod strategy;

#[cfg(test)]
mod testing;

pub use commander::{ActuationReport, ActuatorCommander, CommandOutcome};
pub use config::{ConfigError, DeviceConfig};
pub use device::ValveFanDevice;
pub use environment::{Environment, SharedEnvironment, TargetAttr};
pub use position::{ActuatorTargets, PositionBand, PositionTable};
pub use power::{DemandSource, HvacPowerManager, PowerConfig};
pub use strategy::ValveFanStrategy;
