//! Service Calls
//!
//! Actuators are driven by "service calls" addressed to a domain and a
//! service name on the host (e.g. `valve.set_valve_position`). This module
//! defines the call payload and the `ServiceBus` transport trait the host
//! implements.

mod channel;

pub use channel::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{Context, EntityId};

/// Valve domain and its services
pub const VALVE_DOMAIN: &str = "valve";
pub const SERVICE_SET_VALVE_POSITION: &str = "set_valve_position";

/// Fan domain and its services
pub const FAN_DOMAIN: &str = "fan";
pub const SERVICE_TURN_OFF: &str = "turn_off";
pub const SERVICE_SET_PERCENTAGE: &str = "set_percentage";

pub const ATTR_ENTITY_ID: &str = "entity_id";
pub const ATTR_POSITION: &str = "position";
pub const ATTR_PERCENTAGE: &str = "percentage";

// ─────────────────────────────────────────────────────────────────────────────
// Call Error
// ─────────────────────────────────────────────────────────────────────────────

/// Errors a transport can report for a single call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CallError {
    #[error("Entity unavailable: {0}")]
    Unavailable(String),

    #[error("Service {domain}.{service} not found")]
    ServiceNotFound { domain: String, service: String },

    #[error("Call rejected: {0}")]
    Rejected(String),

    #[error("Call timed out")]
    Timeout,

    #[error("Channel closed")]
    ChannelClosed,
}

/// Result type for service calls
pub type CallResult = Result<(), CallError>;

// ─────────────────────────────────────────────────────────────────────────────
// Service Call
// ─────────────────────────────────────────────────────────────────────────────

/// A single command addressed to a host service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCall {
    /// Service domain (e.g., "valve", "fan")
    pub domain: String,

    /// Service name within the domain (e.g., "set_percentage")
    pub service: String,

    /// Call payload, always carries `entity_id`
    pub data: serde_json::Value,

    /// Whether the caller waits for the service to finish
    pub blocking: bool,
}

impl ServiceCall {
    /// Create a blocking call
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            data,
            blocking: true,
        }
    }

    /// `valve.set_valve_position`
    pub fn set_valve_position(entity: &EntityId, position: u8) -> Self {
        Self::new(
            VALVE_DOMAIN,
            SERVICE_SET_VALVE_POSITION,
            json!({ ATTR_ENTITY_ID: entity.as_str(), ATTR_POSITION: position }),
        )
    }

    /// `fan.turn_off`
    pub fn fan_turn_off(entity: &EntityId) -> Self {
        Self::new(
            FAN_DOMAIN,
            SERVICE_TURN_OFF,
            json!({ ATTR_ENTITY_ID: entity.as_str() }),
        )
    }

    /// `fan.set_percentage`
    pub fn fan_set_percentage(entity: &EntityId, percentage: u8) -> Self {
        Self::new(
            FAN_DOMAIN,
            SERVICE_SET_PERCENTAGE,
            json!({ ATTR_ENTITY_ID: entity.as_str(), ATTR_PERCENTAGE: percentage }),
        )
    }

    /// Fully qualified service name ("fan.turn_off")
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.domain, self.service)
    }

    /// Target entity of the call
    pub fn entity_id(&self) -> Option<&str> {
        self.data.get(ATTR_ENTITY_ID).and_then(|v| v.as_str())
    }

    /// Get an integer field from the payload
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.data.get(key).and_then(|v| v.as_u64())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Bus
// ─────────────────────────────────────────────────────────────────────────────

/// Transport that delivers service calls to the host
///
/// Implementations decide their own timeout policy. A returned error means
/// the call did not take effect; callers never retry automatically.
#[async_trait]
pub trait ServiceBus: Send + Sync {
    async fn call(&self, call: ServiceCall, context: &Context) -> CallResult;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valve_call_payload() {
        let call = ServiceCall::set_valve_position(&EntityId::from("valve.zone_1"), 26);
        assert_eq!(call.qualified_name(), "valve.set_valve_position");
        assert_eq!(call.entity_id(), Some("valve.zone_1"));
        assert_eq!(call.get_u64(ATTR_POSITION), Some(26));
        assert!(call.blocking);
    }

    #[test]
    fn test_fan_calls_are_distinct() {
        let fan = EntityId::from("fan.zone_1");
        let off = ServiceCall::fan_turn_off(&fan);
        let on = ServiceCall::fan_set_percentage(&fan, 40);

        assert_eq!(off.qualified_name(), "fan.turn_off");
        assert_eq!(off.get_u64(ATTR_PERCENTAGE), None);
        assert_eq!(on.qualified_name(), "fan.set_percentage");
        assert_eq!(on.get_u64(ATTR_PERCENTAGE), Some(40));
    }

    #[test]
    fn test_call_error_display() {
        let err = CallError::ServiceNotFound {
            domain: "fan".to_string(),
            service: "spin".to_string(),
        };
        assert_eq!(err.to_string(), "Service fan.spin not found");
    }
}
