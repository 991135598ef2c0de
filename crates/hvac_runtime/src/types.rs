//! Core HVAC Types
//!
//! Modes, actions and identities shared by the lifecycle and the strategies.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// HVAC Mode
// ─────────────────────────────────────────────────────────────────────────────

/// Operating mode selected on the thermostat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HvacMode {
    /// Device is off
    #[default]
    Off,
    /// Raise the temperature
    Heat,
    /// Lower the temperature
    Cool,
}

impl HvacMode {
    /// The direction this mode pushes the temperature in, if any
    pub fn goal(&self) -> Option<HvacGoal> {
        match self {
            HvacMode::Off => None,
            HvacMode::Heat => Some(HvacGoal::Raise),
            HvacMode::Cool => Some(HvacGoal::Lower),
        }
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HvacMode::Off => write!(f, "off"),
            HvacMode::Heat => write!(f, "heat"),
            HvacMode::Cool => write!(f, "cool"),
        }
    }
}

/// Error returned when parsing an unknown mode name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown HVAC mode: {0}")]
pub struct ParseModeError(String);

impl FromStr for HvacMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "off" => Ok(HvacMode::Off),
            "heat" => Ok(HvacMode::Heat),
            "cool" => Ok(HvacMode::Cool),
            other => Err(ParseModeError(other.to_string())),
        }
    }
}

/// Which way the controlled temperature should move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HvacGoal {
    Raise,
    Lower,
}

// ─────────────────────────────────────────────────────────────────────────────
// HVAC Action
// ─────────────────────────────────────────────────────────────────────────────

/// What the device is doing right now (for observability and demand tracking)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HvacAction {
    Off,
    Heating,
    Cooling,
    Idle,
}

impl HvacAction {
    /// Derive the current action from the mode and the active flag
    pub fn from_state(mode: HvacMode, is_active: bool) -> Self {
        match (mode, is_active) {
            (HvacMode::Off, _) => HvacAction::Off,
            (HvacMode::Heat, true) => HvacAction::Heating,
            (HvacMode::Cool, true) => HvacAction::Cooling,
            (_, false) => HvacAction::Idle,
        }
    }

    /// Whether the device is actually moving energy
    pub fn is_running(&self) -> bool {
        matches!(self, HvacAction::Heating | HvacAction::Cooling)
    }
}

impl fmt::Display for HvacAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HvacAction::Off => write!(f, "off"),
            HvacAction::Heating => write!(f, "heating"),
            HvacAction::Cooling => write!(f, "cooling"),
            HvacAction::Idle => write!(f, "idle"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entity Identity
// ─────────────────────────────────────────────────────────────────────────────

/// Opaque handle of a controllable entity on the host (e.g. "valve.radiator")
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Causal Context
// ─────────────────────────────────────────────────────────────────────────────

/// Causal context attached to every service call for traceability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub id: Uuid,
}

impl Context {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
