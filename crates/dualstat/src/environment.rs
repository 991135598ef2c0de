//! Environment
//!
//! Temperatures, setpoints and tolerances shared between the host (which
//! writes sensor updates) and the strategy (which reads a snapshot per call).

use std::sync::Arc;

use hvac_runtime::HvacMode;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Environment shared with the host
pub type SharedEnvironment = Arc<RwLock<Environment>>;

/// Which setpoint drives the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetAttr {
    /// Single setpoint
    Target,
    /// Low end of a heat/cool range
    TargetLow,
}

impl TargetAttr {
    /// Range mode reads the low setpoint, otherwise the single one
    pub fn select(range_mode: bool) -> Self {
        if range_mode {
            TargetAttr::TargetLow
        } else {
            TargetAttr::Target
        }
    }
}

/// Snapshot of temperatures and tolerances
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Environment {
    pub cur_temp: Option<f64>,
    pub target_temp: Option<f64>,
    pub target_temp_low: Option<f64>,
    pub cold_tolerance: f64,
    pub hot_tolerance: f64,
}

impl Environment {
    pub fn new(cold_tolerance: f64, hot_tolerance: f64) -> Self {
        Self {
            cold_tolerance,
            hot_tolerance,
            ..Default::default()
        }
    }

    pub fn shared(self) -> SharedEnvironment {
        Arc::new(RwLock::new(self))
    }

    pub fn target(&self, attr: TargetAttr) -> Option<f64> {
        match attr {
            TargetAttr::Target => self.target_temp,
            TargetAttr::TargetLow => self.target_temp_low,
        }
    }

    /// Current and target temperature, if both are known
    pub fn temperatures(&self, attr: TargetAttr) -> Option<(f64, f64)> {
        Some((self.cur_temp?, self.target(attr)?))
    }

    pub fn is_too_cold(&self, attr: TargetAttr) -> Option<bool> {
        let (cur, target) = self.temperatures(attr)?;
        Some(cur <= target - self.cold_tolerance)
    }

    pub fn is_too_hot(&self, attr: TargetAttr) -> Option<bool> {
        let (cur, target) = self.temperatures(attr)?;
        Some(cur >= target + self.hot_tolerance)
    }

    /// Whether the temperature calls for the device to run
    ///
    /// Heating starts once the room is too cold and keeps running until it
    /// is too hot; cooling mirrors that. `None` if temperatures are missing.
    pub fn call_for_action(
        &self,
        mode: HvacMode,
        is_active: bool,
        attr: TargetAttr,
    ) -> Option<bool> {
        match (mode, is_active) {
            (HvacMode::Off, _) => Some(false),
            (HvacMode::Heat, false) => self.is_too_cold(attr),
            (HvacMode::Heat, true) => self.is_too_hot(attr).map(|hot| !hot),
            (HvacMode::Cool, false) => self.is_too_hot(attr),
            (HvacMode::Cool, true) => self.is_too_cold(attr).map(|cold| !cold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(cur: f64, target: f64) -> Environment {
        Environment {
            cur_temp: Some(cur),
            target_temp: Some(target),
            ..Environment::new(0.5, 0.5)
        }
    }

    #[test]
    fn test_select_target_attr() {
        assert_eq!(TargetAttr::select(false), TargetAttr::Target);
        assert_eq!(TargetAttr::select(true), TargetAttr::TargetLow);

        let mut e = env(20.0, 21.0);
        e.target_temp_low = Some(18.0);
        assert_eq!(e.target(TargetAttr::Target), Some(21.0));
        assert_eq!(e.target(TargetAttr::TargetLow), Some(18.0));
    }

    #[test]
    fn test_heat_hysteresis() {
        let attr = TargetAttr::Target;
        assert_eq!(env(20.4, 21.0).call_for_action(HvacMode::Heat, false, attr), Some(true));
        assert_eq!(env(20.8, 21.0).call_for_action(HvacMode::Heat, false, attr), Some(false));
        // Keeps heating past the target until the hot tolerance is reached
        assert_eq!(env(21.2, 21.0).call_for_action(HvacMode::Heat, true, attr), Some(true));
        assert_eq!(env(21.5, 21.0).call_for_action(HvacMode::Heat, true, attr), Some(false));
    }

    #[test]
    fn test_cool_hysteresis() {
        let attr = TargetAttr::Target;
        assert_eq!(env(25.0, 20.0).call_for_action(HvacMode::Cool, false, attr), Some(true));
        assert_eq!(env(20.2, 20.0).call_for_action(HvacMode::Cool, false, attr), Some(false));
        assert_eq!(env(19.8, 20.0).call_for_action(HvacMode::Cool, true, attr), Some(true));
        assert_eq!(env(19.5, 20.0).call_for_action(HvacMode::Cool, true, attr), Some(false));
    }

    #[test]
    fn test_missing_temperatures() {
        let mut e = env(20.0, 21.0);
        e.cur_temp = None;
        assert_eq!(e.call_for_action(HvacMode::Heat, false, TargetAttr::Target), None);
        assert_eq!(env(20.0, 21.0).temperatures(TargetAttr::TargetLow), None);
        assert_eq!(e.call_for_action(HvacMode::Off, false, TargetAttr::Target), Some(false));
    }
}
