//! Ballast tank records and per-tank transfer bounds.
//!
//! [`TankSet::bounds`] is the only place where tank business rules (operating
//! mode, min/max fill) are turned into decision-variable bounds for the LP.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Operating mode restricting which transfer directions a tank allows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TankMode {
    /// Tank may be filled or discharged.
    #[default]
    Bidirectional,
    /// Tank may only be filled.
    FillOnly,
    /// Tank may only be discharged.
    DischargeOnly,
    /// Tank must not be touched.
    Locked,
}

impl TankMode {
    pub fn allows_fill(self) -> bool {
        matches!(self, TankMode::Bidirectional | TankMode::FillOnly)
    }

    pub fn allows_discharge(self) -> bool {
        matches!(self, TankMode::Bidirectional | TankMode::DischargeOnly)
    }
}

impl fmt::Display for TankMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            TankMode::Bidirectional => "bidirectional",
            TankMode::FillOnly => "fill-only",
            TankMode::DischargeOnly => "discharge-only",
            TankMode::Locked => "locked",
        };
        f.pad(value)
    }
}

impl FromStr for TankMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect();
        match normalized.as_str() {
            "" | "bidirectional" | "both" | "fillanddischarge" | "bi" => {
                Ok(TankMode::Bidirectional)
            }
            "fillonly" | "fill" => Ok(TankMode::FillOnly),
            "dischargeonly" | "discharge" | "drainonly" => Ok(TankMode::DischargeOnly),
            "locked" | "fixed" | "frozen" | "unusable" => Ok(TankMode::Locked),
            _ => Err(format!("unknown tank mode '{s}'")),
        }
    }
}

/// A single ballast tank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tank {
    pub id: String,
    pub capacity_t: f64,
    /// Longitudinal position from midship, positive aft.
    pub x_from_mid_m: f64,
    pub current_t: f64,
    pub min_t: f64,
    pub max_t: f64,
    pub mode: TankMode,
    pub pump_rate_tph: f64,
    /// Relative cost weight; lower is preferred.
    pub priority_weight: f64,
}

impl Tank {
    /// Validate the tank record against `0 <= min <= current <= max <= capacity`.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Error::InvalidTank {
            tank: self.id.clone(),
            message,
        };

        if self.id.trim().is_empty() {
            return Err(Error::InvalidTank {
                tank: self.id.clone(),
                message: "tank identifier must not be empty".to_string(),
            });
        }

        let positive = [
            (self.capacity_t, "Capacity_t"),
            (self.pump_rate_tph, "pump_rate_tph"),
            (self.priority_weight, "priority_weight"),
        ];
        for (value, field) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!(
                    "{field} must be a finite positive number, got {value}"
                )));
            }
        }

        let finite = [
            (self.x_from_mid_m, "x_from_mid_m"),
            (self.current_t, "Current_t"),
            (self.min_t, "Min_t"),
            (self.max_t, "Max_t"),
        ];
        for (value, field) in finite {
            if !value.is_finite() {
                return Err(invalid(format!("{field} must be finite, got {value}")));
            }
        }

        if self.min_t < 0.0 {
            return Err(invalid(format!("Min_t must be non-negative, got {}", self.min_t)));
        }
        if self.min_t > self.max_t {
            return Err(invalid(format!(
                "Min_t ({}) exceeds Max_t ({})",
                self.min_t, self.max_t
            )));
        }
        if self.max_t > self.capacity_t {
            return Err(invalid(format!(
                "Max_t ({}) exceeds Capacity_t ({})",
                self.max_t, self.capacity_t
            )));
        }
        if self.current_t < self.min_t || self.current_t > self.max_t {
            return Err(invalid(format!(
                "Current_t ({}) outside [{}, {}]",
                self.current_t, self.min_t, self.max_t
            )));
        }

        Ok(())
    }
}

/// Non-negative fill and discharge limits for one tank, in tons.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TankBounds {
    pub fill_lower: f64,
    pub fill_upper: f64,
    pub discharge_lower: f64,
    pub discharge_upper: f64,
}

/// Validated, immutable collection of tanks for one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TankSet {
    tanks: Vec<Tank>,
}

impl TankSet {
    /// Validate every tank and reject duplicate identifiers.
    pub fn new(tanks: Vec<Tank>) -> Result<Self> {
        if tanks.is_empty() {
            return Err(Error::EmptyTankSet);
        }

        let mut seen = HashSet::with_capacity(tanks.len());
        for tank in &tanks {
            tank.validate()?;
            if !seen.insert(tank.id.as_str()) {
                return Err(Error::DuplicateTank {
                    tank: tank.id.clone(),
                });
            }
        }

        Ok(Self { tanks })
    }

    pub fn tanks(&self) -> &[Tank] {
        &self.tanks
    }

    pub fn len(&self) -> usize {
        self.tanks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tanks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Tank> {
        self.tanks.iter().find(|tank| tank.id == id)
    }

    /// Fill/discharge bounds for `tank` according to its mode.
    pub fn bounds(tank: &Tank) -> TankBounds {
        let fill_room = (tank.max_t - tank.current_t).max(0.0);
        let discharge_room = (tank.current_t - tank.min_t).max(0.0);

        TankBounds {
            fill_lower: 0.0,
            fill_upper: if tank.mode.allows_fill() { fill_room } else { 0.0 },
            discharge_lower: 0.0,
            discharge_upper: if tank.mode.allows_discharge() {
                discharge_room
            } else {
                0.0
            },
        }
    }

    /// Bounds for every tank in set order.
    pub fn all_bounds(&self) -> Vec<TankBounds> {
        self.tanks.iter().map(Self::bounds).collect()
    }

    /// Sum of current ballast mass across all tanks.
    pub fn total_current_t(&self) -> f64 {
        self.tanks.iter().map(|tank| tank.current_t).sum()
    }
}
