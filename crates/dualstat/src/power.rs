//! HVAC Power / Demand
//!
//! Turns the temperature error into a 0-100 demand percentage that the
//! strategy maps onto valve and fan positions.

use hvac_runtime::{HvacAction, HvacGoal};
use serde::{Deserialize, Serialize};

use crate::environment::{Environment, TargetAttr};

/// Source of the demand signal consumed by actuator strategies
///
/// `update_demand` must run before `demand_percent` is read so the value
/// reflects the current temperatures.
pub trait DemandSource: Send {
    fn update_demand(
        &mut self,
        goal: Option<HvacGoal>,
        target: TargetAttr,
        action: HvacAction,
        environment: &Environment,
    );

    fn demand_percent(&self) -> f64;
}

// ─────────────────────────────────────────────────────────────────────────────
// Power Config
// ─────────────────────────────────────────────────────────────────────────────

/// Power manager configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerConfig {
    /// Temperature error (degrees) that maps to full demand
    pub tolerance: f64,
    /// Number of discrete power levels; continuous when unset
    pub levels: Option<u8>,
    /// Demand used for the smallest non-zero error
    pub min_percent: u8,
    /// Demand used at full error
    pub max_percent: u8,
}

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            tolerance: 2.0,
            levels: None,
            min_percent: 0,
            max_percent: 100,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Power Manager
// ─────────────────────────────────────────────────────────────────────────────

/// Proportional demand with optional level quantization
#[derive(Debug, Clone)]
pub struct HvacPowerManager {
    config: PowerConfig,
    percent: f64,
    level: u8,
}

impl HvacPowerManager {
    pub fn new(config: PowerConfig) -> Self {
        Self {
            config,
            percent: 0.0,
            level: 0,
        }
    }

    pub fn config(&self) -> &PowerConfig {
        &self.config
    }

    /// Current quantized level (0 when idle or unquantized)
    pub fn level(&self) -> u8 {
        self.level
    }

    fn reset(&mut self) {
        self.percent = 0.0;
        self.level = 0;
    }

    fn ratio(&self, error: f64) -> f64 {
        if error <= 0.0 {
            return 0.0;
        }
        if self.config.tolerance <= 0.0 {
            return 1.0;
        }
        (error / self.config.tolerance).min(1.0)
    }
}

impl DemandSource for HvacPowerManager {
    fn update_demand(
        &mut self,
        goal: Option<HvacGoal>,
        target: TargetAttr,
        action: HvacAction,
        environment: &Environment,
    ) {
        if !action.is_running() {
            self.reset();
            return;
        }

        let (Some(goal), Some((cur, target))) = (goal, environment.temperatures(target)) else {
            tracing::debug!("No goal or temperatures, demand reset");
            self.reset();
            return;
        };

        let error = match goal {
            HvacGoal::Raise => target - cur,
            HvacGoal::Lower => cur - target,
        };

        let mut ratio = self.ratio(error);
        if ratio == 0.0 {
            self.reset();
            return;
        }

        match self.config.levels {
            Some(levels) if levels > 0 => {
                let level = (ratio * f64::from(levels)).ceil().clamp(1.0, f64::from(levels)) as u8;
                self.level = level;
                ratio = f64::from(level) / f64::from(levels);
            }
            _ => self.level = 0,
        }

        let min = f64::from(self.config.min_percent);
        let max = f64::from(self.config.max_percent);
        self.percent = (min + ratio * (max - min)).clamp(0.0, 100.0);

        tracing::debug!(
            error,
            level = self.level,
            percent = self.percent,
            "Updated HVAC power"
        );
    }

    fn demand_percent(&self) -> f64 {
        self.percent
    }
}
