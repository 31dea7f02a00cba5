//! LP formulation of one refinement iteration.
//!
//! Variables: `2n` transfer variables (see [`VariableLayout`]) followed by one
//! non-negative slack per gate row. Each gate row is written as
//! `coef · x − slack <= rhs`, so gates can never make the problem infeasible;
//! they only cost `slack_penalty` per metre of violation. Optional target
//! drafts are hard equality rows without slack.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coefficients::{Coefficients, VariableLayout};
use crate::error::{Error, Result};
use crate::gate::{ActiveGates, DraftStation, GateRow, Sense};
use crate::lp::{LpProblem, Relation, VariableBounds};
use crate::predict::StageDrafts;
use crate::tank::TankSet;

/// Penalty per metre of gate violation; dominates any feasible transfer cost.
pub const DEFAULT_SLACK_PENALTY: f64 = 1e7;

/// What the transfer cost measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CostMode {
    /// Cost per ton moved is the tank's priority weight.
    #[default]
    Weight,
    /// Cost per ton is priority weight divided by pump rate (hours moved).
    Time,
}

impl fmt::Display for CostMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CostMode::Weight => "weight",
            CostMode::Time => "time",
        })
    }
}

impl FromStr for CostMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weight" | "mass" | "tons" => Ok(CostMode::Weight),
            "time" | "hours" => Ok(CostMode::Time),
            other => Err(format!("unknown cost mode '{other}'")),
        }
    }
}

/// Optional hard targets for the final forward/aft draft.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct TargetDrafts {
    pub fwd_m: Option<f64>,
    pub aft_m: Option<f64>,
}

impl TargetDrafts {
    pub fn is_empty(&self) -> bool {
        self.fwd_m.is_none() && self.aft_m.is_none()
    }

    pub fn validate(&self) -> Result<()> {
        for (value, field) in [(self.fwd_m, "target_fwd_m"), (self.aft_m, "target_aft_m")] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::InvalidStage {
                        message: format!("{field} must be finite and non-negative, got {v}"),
                    });
                }
            }
        }
        Ok(())
    }
}

/// One gate row in `coefficients · x − slack <= rhs` form.
#[derive(Debug, Clone, PartialEq)]
pub struct GateConstraint {
    pub row: GateRow,
    /// Coefficients over the `2n` transfer variables.
    pub coefficients: Vec<f64>,
    pub rhs: f64,
}

/// Builds gate rows from draft coefficients and the stage's starting drafts.
#[derive(Debug, Clone, Copy)]
pub struct GateConstraintBuilder<'a> {
    coefficients: &'a Coefficients,
    initial: StageDrafts,
}

impl<'a> GateConstraintBuilder<'a> {
    pub fn new(coefficients: &'a Coefficients, initial: StageDrafts) -> Self {
        Self {
            coefficients,
            initial,
        }
    }

    fn station(&self, station: DraftStation) -> (&'a [f64], f64) {
        match station {
            DraftStation::Fwd => (&self.coefficients.dfwd, self.initial.fwd_m),
            DraftStation::Aft => (&self.coefficients.daft, self.initial.aft_m),
            DraftStation::Mean => (&self.coefficients.tmean, self.initial.mean_m()),
        }
    }

    /// Standard `<=` form of a gate row (before the slack column is attached).
    pub fn build(&self, row: &GateRow) -> GateConstraint {
        let (coef, baseline) = self.station(row.station);
        let (coefficients, rhs) = match row.sense {
            Sense::AtMost => (coef.to_vec(), row.limit_m - baseline),
            Sense::AtLeast => (
                coef.iter().map(|c| -c).collect(),
                -(row.limit_m - baseline),
            ),
        };
        GateConstraint {
            row: *row,
            coefficients,
            rhs,
        }
    }

    /// Equality row pinning `station` to `target_m`.
    pub fn target(&self, station: DraftStation, target_m: f64) -> (Vec<f64>, f64) {
        let (coef, baseline) = self.station(station);
        (coef.to_vec(), target_m - baseline)
    }
}

/// Builds the cost vector for transfer and slack variables.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectiveBuilder {
    pub mode: CostMode,
    pub slack_penalty: f64,
}

impl ObjectiveBuilder {
    pub fn new(mode: CostMode, slack_penalty: f64) -> Self {
        Self {
            mode,
            slack_penalty,
        }
    }

    /// Per-ton cost of moving ballast in or out of each tank.
    pub fn tank_cost(&self, tank: &crate::tank::Tank) -> f64 {
        match self.mode {
            CostMode::Weight => tank.priority_weight,
            CostMode::Time => tank.priority_weight / tank.pump_rate_tph,
        }
    }

    /// Costs over the `2n` transfer variables; fill and discharge share the tank's cost.
    pub fn transfer_costs(&self, tanks: &TankSet) -> Vec<f64> {
        let layout = VariableLayout::new(tanks.len());
        let mut costs = vec![0.0; layout.transfer_len()];
        for (i, tank) in tanks.tanks().iter().enumerate() {
            let cost = self.tank_cost(tank);
            costs[layout.fill(i)] = cost;
            costs[layout.discharge(i)] = cost;
        }
        costs
    }
}

/// Complete LP for one iteration plus the metadata needed to read it back.
#[derive(Debug, Clone)]
pub struct StageFormulation {
    pub problem: LpProblem,
    pub layout: VariableLayout,
    /// Gate row behind each slack variable, in variable order after the transfers.
    pub gate_rows: Vec<GateRow>,
}

impl StageFormulation {
    /// Build the LP for `tanks` with draft `coefficients` from the current hydrostatic point.
    pub fn build(
        tanks: &TankSet,
        coefficients: &Coefficients,
        initial: StageDrafts,
        gates: &ActiveGates,
        targets: &TargetDrafts,
        objective: &ObjectiveBuilder,
    ) -> Self {
        let layout = VariableLayout::new(tanks.len());
        let costs = objective.transfer_costs(tanks);
        let mut problem = LpProblem::new();

        for (i, tank) in tanks.tanks().iter().enumerate() {
            let bounds = TankSet::bounds(tank);
            problem.add_variable(
                costs[layout.fill(i)],
                VariableBounds::new(bounds.fill_lower, bounds.fill_upper),
                format!("{}:fill", tank.id),
            );
        }
        for (i, tank) in tanks.tanks().iter().enumerate() {
            let bounds = TankSet::bounds(tank);
            problem.add_variable(
                costs[layout.discharge(i)],
                VariableBounds::new(bounds.discharge_lower, bounds.discharge_upper),
                format!("{}:discharge", tank.id),
            );
        }

        let builder = GateConstraintBuilder::new(coefficients, initial);
        let constraints: Vec<GateConstraint> =
            gates.rows.iter().map(|row| builder.build(row)).collect();

        let slack_start = layout.transfer_len();
        for constraint in &constraints {
            problem.add_variable(
                objective.slack_penalty,
                VariableBounds::non_negative(),
                format!("slack:{:?}:{:?}", constraint.row.gate, constraint.row.station),
            );
        }

        let total = problem.num_vars();
        for (k, constraint) in constraints.iter().enumerate() {
            let mut row = vec![0.0; total];
            row[..slack_start].copy_from_slice(&constraint.coefficients);
            row[slack_start + k] = -1.0;
            problem.add_constraint(
                row,
                Relation::LessEqual,
                constraint.rhs,
                format!(
                    "{} gate ({:?} draft)",
                    constraint.row.gate, constraint.row.station
                ),
            );
        }

        let target_rows = [
            (targets.fwd_m, DraftStation::Fwd, "forward"),
            (targets.aft_m, DraftStation::Aft, "aft"),
        ];
        for (target, station, name) in target_rows {
            if let Some(target_m) = target {
                let (coefficients, rhs) = builder.target(station, target_m);
                problem.add_constraint(
                    coefficients,
                    Relation::Equal,
                    rhs,
                    format!("target {name} draft {target_m:.3} m"),
                );
            }
        }

        Self {
            problem,
            layout,
            gate_rows: gates.rows.clone(),
        }
    }

    /// Transfer part of an LP solution vector.
    pub fn transfers<'v>(&self, values: &'v [f64]) -> &'v [f64] {
        &values[..self.layout.transfer_len()]
    }

    /// Slack part of an LP solution vector, one per gate row.
    pub fn slacks<'v>(&self, values: &'v [f64]) -> &'v [f64] {
        &values[self.layout.transfer_len()..]
    }
}
