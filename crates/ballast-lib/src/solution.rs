//! Solved stage results and the tabular views derived from them.

use std::fmt;

use serde::Serialize;

use crate::formulation::CostMode;
use crate::gate::{GateKind, GateNotice, GateReport};
use crate::hydro::Interpolation;
use crate::predict::{DraftPrediction, StageDrafts};
use crate::refine::IterationResult;
use crate::tank::Tank;

/// Direction of a planned transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferAction {
    Fill,
    Discharge,
    Hold,
}

impl fmt::Display for TransferAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            TransferAction::Fill => "fill",
            TransferAction::Discharge => "discharge",
            TransferAction::Hold => "hold",
        })
    }
}

/// Planned transfer for one tank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TankTransfer {
    pub tank: String,
    pub fill_t: f64,
    pub discharge_t: f64,
    /// Net change, positive when filling.
    pub delta_t: f64,
    /// Total mass moved through the pumps.
    pub pumped_t: f64,
    pub pump_time_h: f64,
    pub final_t: f64,
}

impl TankTransfer {
    pub fn new(tank: &Tank, fill_t: f64, discharge_t: f64) -> Self {
        let delta_t = fill_t - discharge_t;
        let pumped_t = fill_t + discharge_t;
        Self {
            tank: tank.id.clone(),
            fill_t,
            discharge_t,
            delta_t,
            pumped_t,
            pump_time_h: pumped_t / tank.pump_rate_tph,
            final_t: tank.current_t + delta_t,
        }
    }

    pub fn action(&self) -> TransferAction {
        if self.delta_t > 0.0 {
            TransferAction::Fill
        } else if self.delta_t < 0.0 {
            TransferAction::Discharge
        } else {
            TransferAction::Hold
        }
    }
}

/// How the refinement loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Ran the configured number of iterations.
    Exhausted,
    /// Stopped early under the opt-in tolerance.
    Converged,
}

/// Final result of a stage solve.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Solution {
    pub initial: StageDrafts,
    /// One entry per tank in tank-set order, including untouched tanks.
    pub transfers: Vec<TankTransfer>,
    pub prediction: DraftPrediction,
    pub gates: Vec<GateReport>,
    /// Gates deactivated because of partial configuration.
    pub notices: Vec<GateNotice>,
    /// Hydrostatic point used by the final iteration.
    pub hydrostatics: Interpolation,
    pub objective: f64,
    pub cost_mode: CostMode,
    pub termination: Termination,
    pub iterations: Vec<IterationResult>,
}

impl Solution {
    /// Violation magnitude for `gate`: `None` when inactive, `Some(0.0)` when satisfied.
    pub fn violation(&self, gate: GateKind) -> Option<f64> {
        self.gates
            .iter()
            .find(|report| report.gate == gate)
            .map(|report| report.status.magnitude_m())
    }

    pub fn has_violations(&self) -> bool {
        self.gates.iter().any(|report| report.status.is_violated())
    }

    /// Sum of per-tank pump time; pumps are assumed to run one after another.
    pub fn total_pump_time_h(&self) -> f64 {
        self.transfers.iter().map(|t| t.pump_time_h).sum()
    }

    /// Ballast plan rows for tanks that actually move.
    pub fn plan_rows(&self) -> Vec<BallastPlanRow> {
        self.transfers
            .iter()
            .filter(|t| t.action() != TransferAction::Hold)
            .map(|t| BallastPlanRow {
                tank: t.tank.clone(),
                action: t.action(),
                delta_t: t.delta_t,
                pump_time_h: t.pump_time_h,
            })
            .collect()
    }

    pub fn summary(&self) -> StageSummary {
        StageSummary {
            fwd_new_m: self.prediction.fwd_m,
            aft_new_m: self.prediction.aft_m,
            trim_new_m: self.prediction.trim_m,
            tmean_new_m: self.prediction.mean_m,
            total_delta_t: self.prediction.total_delta_t,
            viol_fwd_max_m: self.violation(GateKind::FwdMax),
            viol_aft_min_m: self.violation(GateKind::AftMin),
            viol_fb_m: self.violation(GateKind::Freeboard),
            viol_ukc_m: self.violation(GateKind::Ukc),
        }
    }
}

/// One row of the ballast plan table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BallastPlanRow {
    #[serde(rename = "Tank")]
    pub tank: String,
    #[serde(rename = "Action")]
    pub action: TransferAction,
    #[serde(rename = "Delta_t")]
    pub delta_t: f64,
    #[serde(rename = "PumpTime_h")]
    pub pump_time_h: f64,
}

/// Summary table row. Violation columns are empty for inactive gates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSummary {
    #[serde(rename = "FWD_new_m")]
    pub fwd_new_m: f64,
    #[serde(rename = "AFT_new_m")]
    pub aft_new_m: f64,
    #[serde(rename = "Trim_new_m")]
    pub trim_new_m: f64,
    #[serde(rename = "Tmean_new_m")]
    pub tmean_new_m: f64,
    #[serde(rename = "Total_Delta_t")]
    pub total_delta_t: f64,
    pub viol_fwd_max_m: Option<f64>,
    pub viol_aft_min_m: Option<f64>,
    pub viol_fb_m: Option<f64>,
    pub viol_ukc_m: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tank::fixtures::tank;
    use crate::tank::TankMode;

    #[test]
    fn transfer_derives_action_and_pump_time() {
        let t = tank("WB2", 10.0, 40.0, TankMode::Bidirectional);
        let transfer = TankTransfer::new(&t, 0.0, 25.0);
        assert_eq!(transfer.action(), TransferAction::Discharge);
        assert_eq!(transfer.delta_t, -25.0);
        assert_eq!(transfer.pump_time_h, 0.5);
        assert_eq!(transfer.final_t, 15.0);

        let idle = TankTransfer::new(&t, 0.0, 0.0);
        assert_eq!(idle.action(), TransferAction::Hold);
    }

    #[test]
    fn action_honours_width_and_alignment() {
        assert_eq!(format!("{:<10}|", TransferAction::Fill), "fill      |");
        assert_eq!(format!("{:>9}", TransferAction::Hold), "     hold");
    }
}
