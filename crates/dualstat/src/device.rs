//! Valve + Fan Device
//!
//! Composes the lifecycle controller with the valve/fan strategy. The
//! controller decides when to switch; after every control cycle an active
//! device re-applies valve position and fan speed so demand changes are
//! tracked between transitions.

use std::sync::Arc;
use std::time::Instant;

use hvac_runtime::service::ServiceBus;
use hvac_runtime::{
    ControlInputs, ControlOutcome, EntityId, HvacAction, HvacController, HvacMode,
};

use crate::commander::ActuatorCommander;
use crate::config::{ConfigError, DeviceConfig};
use crate::environment::SharedEnvironment;
use crate::power::{DemandSource, HvacPowerManager};
use crate::strategy::ValveFanStrategy;

pub struct ValveFanDevice<D> {
    name: String,
    lifecycle: HvacController,
    strategy: ValveFanStrategy<D>,
    openings_open: bool,
}

impl ValveFanDevice<HvacPowerManager> {
    /// Build a device driven by the proportional power manager
    pub fn from_config(
        config: &DeviceConfig,
        bus: Arc<dyn ServiceBus>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let commander = ActuatorCommander::new(
            config.valve_entity_id.clone(),
            config.fan_entity_id.clone(),
            bus,
        );
        let strategy = ValveFanStrategy::new(
            commander,
            config.positions,
            HvacPowerManager::new(config.power),
            config.environment().shared(),
            config.range_mode,
        );
        let lifecycle = HvacController::new(config.initial_hvac_mode, config.min_cycle_duration());

        Ok(Self::new(config.name.clone(), lifecycle, strategy))
    }
}

impl<D: DemandSource> ValveFanDevice<D> {
    pub fn new(
        name: impl Into<String>,
        lifecycle: HvacController,
        strategy: ValveFanStrategy<D>,
    ) -> Self {
        Self {
            name: name.into(),
            lifecycle,
            strategy,
            openings_open: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hvac_modes(&self) -> &'static [HvacMode] {
        &HvacController::HVAC_MODES
    }

    pub fn hvac_mode(&self) -> HvacMode {
        self.lifecycle.mode()
    }

    pub fn is_active(&self) -> bool {
        self.lifecycle.is_active()
    }

    /// Off, Heating, Cooling or Idle from the mode and active flag
    pub fn hvac_action(&self) -> HvacAction {
        let action = self.lifecycle.state().action();
        tracing::debug!(
            device = %self.name,
            is_active = self.is_active(),
            mode = %self.hvac_mode(),
            %action,
            "hvac_action"
        );
        action
    }

    /// Valve and fan identities, for registering the pair with the host
    pub fn device_ids(&self) -> Vec<EntityId> {
        self.strategy.device_ids()
    }

    pub fn environment(&self) -> &SharedEnvironment {
        self.strategy.environment()
    }

    pub fn strategy(&self) -> &ValveFanStrategy<D> {
        &self.strategy
    }

    pub fn set_openings_open(&mut self, open: bool) {
        self.openings_open = open;
    }

    pub async fn set_hvac_mode(&mut self, mode: HvacMode) {
        self.lifecycle
            .set_mode(mode, &mut self.strategy, Instant::now())
            .await;
    }

    /// Switch the device off and park the actuators
    pub async fn shutdown(&mut self) {
        self.set_hvac_mode(HvacMode::Off).await;
    }

    /// Run one control cycle
    ///
    /// The lifecycle runs first and may turn the device on or off; an active
    /// device in a heating or cooling mode then re-applies its targets. A
    /// device missing its valve or fan identity never calls for action, so
    /// it stays idle and sends nothing.
    pub async fn control_hvac(&mut self, time: Option<Instant>, force: bool) -> ControlOutcome {
        tracing::debug!(device = %self.name, force, "control_hvac called");

        let inputs = self.control_inputs();
        let now = time.unwrap_or_else(Instant::now);
        let outcome = self
            .lifecycle
            .control(&mut self.strategy, inputs, now, force)
            .await;

        let state = self.lifecycle.state();
        if state.is_active && state.mode != HvacMode::Off {
            self.strategy.apply(&state).await;
        }

        outcome
    }

    fn control_inputs(&self) -> ControlInputs {
        let state = self.lifecycle.state();
        let call_for_action = if self.strategy.is_configured() {
            let environment = *self.environment().read();
            environment.call_for_action(state.mode, state.is_active, self.strategy.target_attr())
        } else {
            tracing::warn!(device = %self.name, "Valve or fan entity not configured, staying idle");
            Some(false)
        };

        ControlInputs {
            call_for_action,
            openings_open: self.openings_open,
        }
    }
}
