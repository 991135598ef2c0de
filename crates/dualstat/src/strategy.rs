//! Valve + Fan Strategy
//!
//! Drives a position valve and a variable speed fan together from one
//! demand signal. Implements `Actuator` so the lifecycle controller can turn
//! it on and off; `apply` re-tracks demand while already running.

use async_trait::async_trait;
use hvac_runtime::{Actuator, DeviceState, EntityId, HvacAction, HvacMode};

use crate::commander::{ActuationReport, ActuatorCommander, CommandOutcome};
use crate::environment::{SharedEnvironment, TargetAttr};
use crate::position::{ActuatorTargets, PositionTable};
use crate::power::DemandSource;

pub struct ValveFanStrategy<D> {
    commander: ActuatorCommander,
    positions: PositionTable,
    demand: D,
    environment: SharedEnvironment,
    range_mode: bool,
}

impl<D: DemandSource> ValveFanStrategy<D> {
    pub fn new(
        commander: ActuatorCommander,
        positions: PositionTable,
        demand: D,
        environment: SharedEnvironment,
        range_mode: bool,
    ) -> Self {
        Self {
            commander,
            positions,
            demand,
            environment,
            range_mode,
        }
    }

    pub fn commander(&self) -> &ActuatorCommander {
        &self.commander
    }

    pub fn positions(&self) -> &PositionTable {
        &self.positions
    }

    pub fn demand(&self) -> &D {
        &self.demand
    }

    pub fn environment(&self) -> &SharedEnvironment {
        &self.environment
    }

    pub fn device_ids(&self) -> Vec<EntityId> {
        self.commander.device_ids()
    }

    /// The pair can only run when both identities are known
    pub fn is_configured(&self) -> bool {
        self.commander.is_configured()
    }

    /// Setpoint this strategy tracks
    pub fn target_attr(&self) -> TargetAttr {
        TargetAttr::select(self.range_mode)
    }

    /// Refresh demand and compute valve and fan targets for `state`
    ///
    /// Falls back to the off targets when the mode is off or when the
    /// temperatures needed for demand are missing.
    pub fn compute_targets(&mut self, state: &DeviceState) -> ActuatorTargets {
        if state.mode == HvacMode::Off {
            return ActuatorTargets::off(&self.positions);
        }

        let target = self.target_attr();
        let environment = *self.environment.read();
        if environment.temperatures(target).is_none() {
            tracing::warn!("Temperature values not available, using off position");
            return ActuatorTargets::off(&self.positions);
        }

        self.demand
            .update_demand(state.mode.goal(), target, state.action(), &environment);
        ActuatorTargets::compute(&self.positions, state.mode, self.demand.demand_percent())
    }

    /// Compute and send valve position then fan speed
    ///
    /// Sends nothing unless both identities are configured.
    pub async fn apply(&mut self, state: &DeviceState) -> ActuationReport {
        if !self.is_configured() {
            tracing::debug!("Valve or fan entity not configured, skipping apply");
            return ActuationReport {
                valve: CommandOutcome::Skipped,
                fan: CommandOutcome::Skipped,
            };
        }

        let targets = self.compute_targets(state);
        tracing::debug!(
            mode = %state.mode,
            position = targets.valve_position,
            fan_speed = targets.fan_speed,
            "Applying actuator targets"
        );
        self.commander.apply(targets).await
    }
}

#[async_trait]
impl<D: DemandSource> Actuator for ValveFanStrategy<D> {
    async fn turn_on(&mut self, state: &DeviceState) {
        if !self.is_configured() {
            tracing::warn!(
                valve = ?self.commander.valve(),
                fan = ?self.commander.fan(),
                "Valve or fan entity not configured, not turning on"
            );
            return;
        }
        tracing::info!(
            valve = ?self.commander.valve(),
            fan = ?self.commander.fan(),
            "Setting valve position and fan speed"
        );

        self.apply(state).await;
    }

    async fn turn_off(&mut self, state: &DeviceState) {
        tracing::info!(
            valve = ?self.commander.valve(),
            fan = ?self.commander.fan(),
            "Turning off valve and fan"
        );

        self.commander.set_valve_position(self.positions.off).await;
        self.commander.set_fan_speed(0).await;

        let environment = *self.environment.read();
        self.demand.update_demand(
            state.mode.goal(),
            self.target_attr(),
            HvacAction::Off,
            &environment,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hvac_runtime::service::CallError;

    use crate::environment::Environment;
    use crate::testing::{FixedDemand, RecordingBus};

    fn environment(cur: f64, target: f64) -> SharedEnvironment {
        Environment {
            cur_temp: Some(cur),
            target_temp: Some(target),
            ..Environment::new(0.3, 0.3)
        }
        .shared()
    }

    fn strategy(
        bus: &Arc<RecordingBus>,
        valve: Option<&str>,
        fan: Option<&str>,
        demand: f64,
    ) -> ValveFanStrategy<FixedDemand> {
        let commander = ActuatorCommander::new(
            valve.map(EntityId::from),
            fan.map(EntityId::from),
            bus.clone(),
        );
        let (demand, _) = FixedDemand::new(demand);
        ValveFanStrategy::new(
            commander,
            PositionTable::default(),
            demand,
            environment(21.0, 22.0),
            false,
        )
    }

    const HEATING: DeviceState = DeviceState {
        mode: HvacMode::Heat,
        is_active: true,
    };

    #[tokio::test]
    async fn test_turn_on_sets_valve_then_fan() {
        let bus = RecordingBus::new();
        let mut strategy = strategy(&bus, Some("valve.a"), Some("fan.a"), 50.0);

        strategy.turn_on(&HEATING).await;

        let calls = bus.calls();
        assert_eq!(bus.services(), vec!["valve.set_valve_position", "fan.set_percentage"]);
        assert_eq!(calls[0].get_u64("position"), Some(80));
        assert_eq!(calls[1].get_u64("percentage"), Some(50));
    }

    #[tokio::test]
    async fn test_turn_on_aborts_when_fan_missing() {
        let bus = RecordingBus::new();
        let mut strategy = strategy(&bus, Some("valve.a"), None, 50.0);

        strategy.turn_on(&HEATING).await;
        strategy.turn_on(&HEATING).await;

        assert!(bus.calls().is_empty());
    }

    #[tokio::test]
    async fn test_turn_on_aborts_when_valve_missing() {
        let bus = RecordingBus::new();
        let mut strategy = strategy(&bus, None, Some("fan.a"), 50.0);

        strategy.turn_on(&HEATING).await;

        assert!(bus.calls().is_empty());
    }

    #[tokio::test]
    async fn test_apply_skips_incomplete_pair() {
        let bus = RecordingBus::new();
        let mut strategy = strategy(&bus, Some("valve.a"), None, 50.0);
        assert!(!strategy.is_configured());

        let report = strategy.apply(&HEATING).await;

        assert_eq!(report.valve, CommandOutcome::Skipped);
        assert_eq!(report.fan, CommandOutcome::Skipped);
        assert!(bus.calls().is_empty());
    }

    #[tokio::test]
    async fn test_turn_off_is_idempotent() {
        let bus = RecordingBus::new();
        let mut strategy = strategy(&bus, Some("valve.a"), Some("fan.a"), 50.0);
        let state = DeviceState {
            mode: HvacMode::Heat,
            is_active: false,
        };

        strategy.turn_off(&state).await;
        let first = bus.calls();
        bus.clear();
        strategy.turn_off(&state).await;

        assert_eq!(bus.calls(), first);
        assert_eq!(bus.services(), vec!["valve.set_valve_position", "fan.turn_off"]);
        assert_eq!(first[0].get_u64("position"), Some(55));
    }

    #[tokio::test]
    async fn test_turn_off_actuates_present_side_only() {
        let bus = RecordingBus::new();
        let mut strategy = strategy(&bus, None, Some("fan.a"), 50.0);

        strategy.turn_off(&HEATING).await;

        assert_eq!(bus.services(), vec!["fan.turn_off"]);
    }

    #[tokio::test]
    async fn test_turn_off_notifies_demand_source() {
        let bus = RecordingBus::new();
        let commander = ActuatorCommander::new(
            Some(EntityId::from("valve.a")),
            Some(EntityId::from("fan.a")),
            bus.clone(),
        );
        let (demand, updates) = FixedDemand::new(40.0);
        let mut strategy = ValveFanStrategy::new(
            commander,
            PositionTable::default(),
            demand,
            environment(21.0, 22.0),
            false,
        );

        strategy.turn_on(&HEATING).await;
        strategy.turn_off(&HEATING).await;

        assert_eq!(*updates.lock(), vec![HvacAction::Heating, HvacAction::Off]);
    }

    #[tokio::test]
    async fn test_turn_off_continues_after_valve_failure() {
        let bus = RecordingBus::new();
        bus.fail_domain("valve", CallError::Timeout);
        let mut strategy = strategy(&bus, Some("valve.a"), Some("fan.a"), 50.0);

        strategy.turn_off(&HEATING).await;

        assert_eq!(bus.services(), vec!["valve.set_valve_position", "fan.turn_off"]);
    }

    #[tokio::test]
    async fn test_missing_temperature_uses_off_targets() {
        let bus = RecordingBus::new();
        let mut strategy = strategy(&bus, Some("valve.a"), Some("fan.a"), 70.0);
        strategy.environment().write().cur_temp = None;

        let report = strategy.apply(&HEATING).await;

        assert_eq!(report.valve, CommandOutcome::Applied);
        let calls = bus.calls();
        assert_eq!(calls[0].get_u64("position"), Some(55));
        assert_eq!(calls[1].qualified_name(), "fan.turn_off");
    }

    #[tokio::test]
    async fn test_range_mode_reads_low_setpoint() {
        let bus = RecordingBus::new();
        let commander = ActuatorCommander::new(
            Some(EntityId::from("valve.a")),
            Some(EntityId::from("fan.a")),
            bus.clone(),
        );
        let (demand, updates) = FixedDemand::new(40.0);
        let env = environment(21.0, 22.0);
        let mut strategy =
            ValveFanStrategy::new(commander, PositionTable::default(), demand, env.clone(), true);
        assert_eq!(strategy.target_attr(), TargetAttr::TargetLow);

        // No low setpoint yet: demand is not consulted
        let targets = strategy.compute_targets(&HEATING);
        assert_eq!(targets, ActuatorTargets::off(&PositionTable::default()));
        assert!(updates.lock().is_empty());

        env.write().target_temp_low = Some(20.0);
        let targets = strategy.compute_targets(&HEATING);
        assert_eq!(targets.valve_position, 76);
        assert_eq!(updates.lock().len(), 1);
    }
}
