//! Position Mapping
//!
//! Translates a demand percentage into a valve position and a fan speed.
//!
//! The valve uses one position value for every mode, split into disjoint
//! bands:
//!
//! ```text
//!  0 ──────── 20 ═══ cool ═══ 50 ─ 55 (off) ─ 60 ═══ heat ═══ 100
//!             ▲ fully open     ▲ barely open   ▲ barely open   ▲ fully open
//! ```
//!
//! Interpolated positions are truncated toward zero, then clamped into the
//! mode's band, so out-of-range demand can never leave the band.

use hvac_runtime::HvacMode;
use serde::{Deserialize, Serialize};

/// Errors in a configured position table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionTableError {
    #[error("Position {0} is outside 0-100")]
    OutOfRange(u8),

    #[error("Off position {position} lies inside the {mode} band")]
    OffInsideBand { position: u8, mode: HvacMode },

    #[error("Cooling and heating bands overlap")]
    Overlap,
}

// ─────────────────────────────────────────────────────────────────────────────
// Position Band
// ─────────────────────────────────────────────────────────────────────────────

/// Valve positions used at zero and at full demand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionBand {
    pub min_demand: u8,
    pub max_demand: u8,
}

impl PositionBand {
    pub const fn new(min_demand: u8, max_demand: u8) -> Self {
        Self {
            min_demand,
            max_demand,
        }
    }

    /// Lowest numeric position in the band
    pub fn low(&self) -> u8 {
        self.min_demand.min(self.max_demand)
    }

    /// Highest numeric position in the band
    pub fn high(&self) -> u8 {
        self.min_demand.max(self.max_demand)
    }

    pub fn contains(&self, position: u8) -> bool {
        (self.low()..=self.high()).contains(&position)
    }

    /// Linear interpolation from `min_demand` (0%) to `max_demand` (100%)
    ///
    /// Multiplies before dividing so integral demands land on exact
    /// positions (80% of a 30 point span is 24, not 23.999...).
    pub fn interpolate(&self, demand_percent: f64) -> u8 {
        let demand = if demand_percent.is_nan() {
            0.0
        } else {
            demand_percent
        };
        let start = f64::from(self.min_demand);
        let span = f64::from(self.max_demand) - start;
        let raw = start + demand * span / 100.0;
        raw.trunc()
            .clamp(f64::from(self.low()), f64::from(self.high())) as u8
    }

    fn overlaps(&self, other: &PositionBand) -> bool {
        self.low() <= other.high() && other.low() <= self.high()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Position Table
// ─────────────────────────────────────────────────────────────────────────────

/// Per-mode valve positions, fixed for the lifetime of a strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionTable {
    pub off: u8,
    pub cool: PositionBand,
    pub heat: PositionBand,
}

impl PositionTable {
    pub const OFF_POSITION: u8 = 55;
    pub const COOL_BAND: PositionBand = PositionBand::new(50, 20);
    pub const HEAT_BAND: PositionBand = PositionBand::new(60, 100);

    pub fn validate(&self) -> Result<(), PositionTableError> {
        for position in [
            self.off,
            self.cool.min_demand,
            self.cool.max_demand,
            self.heat.min_demand,
            self.heat.max_demand,
        ] {
            if position > 100 {
                return Err(PositionTableError::OutOfRange(position));
            }
        }

        for (mode, band) in [(HvacMode::Cool, &self.cool), (HvacMode::Heat, &self.heat)] {
            if band.contains(self.off) {
                return Err(PositionTableError::OffInsideBand {
                    position: self.off,
                    mode,
                });
            }
        }

        if self.cool.overlaps(&self.heat) {
            return Err(PositionTableError::Overlap);
        }

        Ok(())
    }

    /// Band used in a mode, `None` for off
    pub fn band(&self, mode: HvacMode) -> Option<&PositionBand> {
        match mode {
            HvacMode::Off => None,
            HvacMode::Cool => Some(&self.cool),
            HvacMode::Heat => Some(&self.heat),
        }
    }
}

impl Default for PositionTable {
    fn default() -> Self {
        Self {
            off: Self::OFF_POSITION,
            cool: Self::COOL_BAND,
            heat: Self::HEAT_BAND,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mapping
// ─────────────────────────────────────────────────────────────────────────────

/// Valve position for a mode and demand
pub fn valve_position(table: &PositionTable, mode: HvacMode, demand_percent: f64) -> u8 {
    match table.band(mode) {
        Some(band) => band.interpolate(demand_percent),
        None => table.off,
    }
}

/// Fan speed for a mode and demand (0 means the fan is powered off)
pub fn fan_speed(mode: HvacMode, demand_percent: f64) -> u8 {
    if mode == HvacMode::Off || demand_percent.is_nan() {
        return 0;
    }
    demand_percent.trunc().clamp(0.0, 100.0) as u8
}

/// Valve and fan values computed together for one actuation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActuatorTargets {
    pub valve_position: u8,
    pub fan_speed: u8,
}

impl ActuatorTargets {
    pub fn compute(table: &PositionTable, mode: HvacMode, demand_percent: f64) -> Self {
        Self {
            valve_position: valve_position(table, mode, demand_percent),
            fan_speed: fan_speed(mode, demand_percent),
        }
    }

    /// Targets used when off or when demand cannot be computed
    pub fn off(table: &PositionTable) -> Self {
        Self {
            valve_position: table.off,
            fan_speed: 0,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
