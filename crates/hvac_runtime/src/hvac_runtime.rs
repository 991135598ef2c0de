//! HVAC Runtime - host vocabulary and device lifecycle
//!
//! This crate contains the types shared between a thermostat host and the
//! actuator strategies it drives:
//! - `types`: modes, actions, entity identities and causal contexts
//! - `service`: the service-call transport (`ServiceBus`) and its payloads
//! - `controller`: the mode/active lifecycle that decides when to turn on or off

mod controller;
mod types;

pub mod service;

pub use controller::*;
pub use types::*;
