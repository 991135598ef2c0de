//! Actuator Commander
//!
//! Issues valve and fan service calls. Every call is best effort: a failure
//! is logged and returned as a `CommandOutcome`, it never aborts the caller
//! and is never retried.

use std::sync::Arc;

use hvac_runtime::service::{CallError, ServiceBus, ServiceCall};
use hvac_runtime::{Context, EntityId};

use crate::position::ActuatorTargets;

/// Result of a single actuator command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The transport accepted the call
    Applied,
    /// No entity configured for this actuator
    Skipped,
    /// The transport reported a failure
    Failed(CallError),
}

impl CommandOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, CommandOutcome::Applied)
    }
}

/// Outcomes of a combined valve + fan actuation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuationReport {
    pub valve: CommandOutcome,
    pub fan: CommandOutcome,
}

/// Sends position and speed commands to a valve and a fan
pub struct ActuatorCommander {
    valve: Option<EntityId>,
    fan: Option<EntityId>,
    bus: Arc<dyn ServiceBus>,
    context: Context,
}

impl ActuatorCommander {
    pub fn new(valve: Option<EntityId>, fan: Option<EntityId>, bus: Arc<dyn ServiceBus>) -> Self {
        Self {
            valve,
            fan,
            bus,
            context: Context::new(),
        }
    }

    pub fn valve(&self) -> Option<&EntityId> {
        self.valve.as_ref()
    }

    pub fn fan(&self) -> Option<&EntityId> {
        self.fan.as_ref()
    }

    /// Causal context attached to every call
    /// Both the valve and the fan identity are present
    pub fn is_configured(&self) -> bool {
        self.valve.is_some() && self.fan.is_some()
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Identities of the configured actuators, valve first
    pub fn device_ids(&self) -> Vec<EntityId> {
        self.valve.iter().chain(self.fan.iter()).cloned().collect()
    }

    /// Set the valve opening position
    pub async fn set_valve_position(&self, position: u8) -> CommandOutcome {
        let Some(valve) = &self.valve else {
            return CommandOutcome::Skipped;
        };

        tracing::info!(entity = %valve, position, "Setting valve position");

        match self
            .bus
            .call(ServiceCall::set_valve_position(valve, position), &self.context)
            .await
        {
            Ok(()) => {
                tracing::debug!("Successfully set valve position to {}%", position);
                CommandOutcome::Applied
            }
            Err(e) => {
                tracing::error!(
                    "Error setting valve position for entity {} to {}%: {}",
                    valve,
                    position,
                    e
                );
                CommandOutcome::Failed(e)
            }
        }
    }

    /// Set the fan speed; 0 powers the fan off rather than setting 0%
    pub async fn set_fan_speed(&self, speed_percent: u8) -> CommandOutcome {
        let Some(fan) = &self.fan else {
            return CommandOutcome::Skipped;
        };

        tracing::info!(entity = %fan, speed = speed_percent, "Setting fan speed");

        let call = if speed_percent == 0 {
            ServiceCall::fan_turn_off(fan)
        } else {
            ServiceCall::fan_set_percentage(fan, speed_percent.min(100))
        };

        match self.bus.call(call, &self.context).await {
            Ok(()) => {
                tracing::debug!("Successfully set fan speed to {}%", speed_percent);
                CommandOutcome::Applied
            }
            Err(e) => {
                tracing::error!(
                    "Error setting fan speed for entity {} to {}%: {}",
                    fan,
                    speed_percent,
                    e
                );
                CommandOutcome::Failed(e)
            }
        }
    }

    /// Valve first, then fan; the fan runs whatever happened to the valve
    pub async fn apply(&self, targets: ActuatorTargets) -> ActuationReport {
        let valve = self.set_valve_position(targets.valve_position).await;
        let fan = self.set_fan_speed(targets.fan_speed).await;
        ActuationReport { valve, fan }
    }
}
