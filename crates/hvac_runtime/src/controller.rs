//! Device Lifecycle
//!
//! The controller owns the mode and the active flag of a device and decides,
//! on every control cycle, whether the actuators should be switched on or
//! off. Strategies plug in through the `Actuator` trait.
//!
//! # Gating
//!
//! - Mode `Off` never turns anything on.
//! - Open openings (windows, doors) switch an active device off immediately.
//! - Otherwise a switch only happens once `min_cycle_duration` has passed
//!   since the last one, unless the cycle is forced.

use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::{HvacAction, HvacMode};

// ─────────────────────────────────────────────────────────────────────────────
// Device State
// ─────────────────────────────────────────────────────────────────────────────

/// Snapshot of the lifecycle state handed to actuators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    pub mode: HvacMode,
    pub is_active: bool,
}

impl DeviceState {
    pub fn action(&self) -> HvacAction {
        HvacAction::from_state(self.mode, self.is_active)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Actuator Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Capability a strategy provides to the lifecycle owner
///
/// Both hooks are infallible from the controller's point of view: an
/// actuator contains and logs its own failures.
#[async_trait]
pub trait Actuator: Send {
    /// Drive the actuators for the given (already active) state
    async fn turn_on(&mut self, state: &DeviceState);

    /// Drive the actuators to their off state
    async fn turn_off(&mut self, state: &DeviceState);
}

// ─────────────────────────────────────────────────────────────────────────────
// Control Inputs / Outcome
// ─────────────────────────────────────────────────────────────────────────────

/// Inputs evaluated by the host for one control cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlInputs {
    /// Whether the temperature calls for the device to run;
    /// `None` when sensor data is missing
    pub call_for_action: Option<bool>,

    /// Whether any opening in scope is currently open
    pub openings_open: bool,
}

/// What a control cycle did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlOutcome {
    /// Nothing to change
    Unchanged,
    /// Actuators were turned on
    TurnedOn,
    /// Actuators were turned off
    TurnedOff,
    /// A switch was wanted but the minimum cycle duration has not elapsed
    Deferred,
}

// ─────────────────────────────────────────────────────────────────────────────
// HVAC Controller
// ─────────────────────────────────────────────────────────────────────────────

/// Mode and active-state machine for a single device
#[derive(Debug, Clone)]
pub struct HvacController {
    mode: HvacMode,
    active: bool,
    min_cycle_duration: Duration,
    last_switch: Option<Instant>,
}

impl HvacController {
    /// Modes a controller accepts
    pub const HVAC_MODES: [HvacMode; 3] = [HvacMode::Heat, HvacMode::Cool, HvacMode::Off];

    pub fn new(initial_mode: HvacMode, min_cycle_duration: Duration) -> Self {
        Self {
            mode: initial_mode,
            active: false,
            min_cycle_duration,
            last_switch: None,
        }
    }

    pub fn mode(&self) -> HvacMode {
        self.mode
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn min_cycle_duration(&self) -> Duration {
        self.min_cycle_duration
    }

    pub fn state(&self) -> DeviceState {
        DeviceState {
            mode: self.mode,
            is_active: self.active,
        }
    }

    /// Change the mode
    ///
    /// Any change turns the actuators off; the next control cycle decides
    /// whether to run again in the new mode.
    pub async fn set_mode(&mut self, mode: HvacMode, actuator: &mut dyn Actuator, now: Instant) {
        if mode == self.mode {
            return;
        }

        tracing::info!(from = %self.mode, to = %mode, "Changing HVAC mode");
        self.mode = mode;

        if self.active || mode == HvacMode::Off {
            self.switch_off(actuator, now).await;
        }
    }

    /// Run one control cycle
    pub async fn control(
        &mut self,
        actuator: &mut dyn Actuator,
        inputs: ControlInputs,
        now: Instant,
        force: bool,
    ) -> ControlOutcome {
        if self.mode == HvacMode::Off {
            if self.active {
                self.switch_off(actuator, now).await;
                return ControlOutcome::TurnedOff;
            }
            return ControlOutcome::Unchanged;
        }

        if inputs.openings_open {
            if self.active {
                tracing::info!("Opening detected, turning off");
                self.switch_off(actuator, now).await;
                return ControlOutcome::TurnedOff;
            }
            tracing::debug!("Opening detected, staying off");
            return ControlOutcome::Unchanged;
        }

        let Some(call_for_action) = inputs.call_for_action else {
            tracing::warn!("Temperature data unavailable, skipping control cycle");
            return ControlOutcome::Unchanged;
        };

        match (call_for_action, self.active) {
            (true, false) => {
                if !force && !self.cycle_elapsed(now) {
                    tracing::debug!("Minimum cycle duration not reached, deferring turn on");
                    return ControlOutcome::Deferred;
                }
                self.switch_on(actuator, now).await;
                ControlOutcome::TurnedOn
            }
            (false, true) => {
                if !force && !self.cycle_elapsed(now) {
                    tracing::debug!("Minimum cycle duration not reached, deferring turn off");
                    return ControlOutcome::Deferred;
                }
                self.switch_off(actuator, now).await;
                ControlOutcome::TurnedOff
            }
            _ => ControlOutcome::Unchanged,
        }
    }

    fn cycle_elapsed(&self, now: Instant) -> bool {
        match self.last_switch {
            Some(last) => now.saturating_duration_since(last) >= self.min_cycle_duration,
            None => true,
        }
    }

    async fn switch_on(&mut self, actuator: &mut dyn Actuator, now: Instant) {
        self.active = true;
        self.last_switch = Some(now);
        let state = self.state();
        actuator.turn_on(&state).await;
    }

    async fn switch_off(&mut self, actuator: &mut dyn Actuator, now: Instant) {
        if self.active {
            self.last_switch = Some(now);
        }
        self.active = false;
        let state = self.state();
        actuator.turn_off(&state).await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
