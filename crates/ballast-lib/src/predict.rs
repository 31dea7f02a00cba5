//! Linearized draft prediction.
//!
//! ```text
//! ΔTmean = Σ Δm_i / (TPC · 100)
//! ΔTrim  = Σ Δm_i · (x_i − LCF) / (MTC · 100)
//! Dfwd'  = Dfwd + ΔTmean − ΔTrim / 2
//! Daft'  = Daft + ΔTmean + ΔTrim / 2
//! ```
//!
//! Positive trim is stern-down. The response is only valid for small changes;
//! the refinement loop re-evaluates the hydrostatic point at the predicted
//! draft to compensate.

use serde::{Deserialize, Serialize};

use crate::coefficients::{dot, moment_arms};
use crate::error::{Error, Result};
use crate::hydro::HydrostaticPoint;
use crate::tank::TankSet;

/// Forward and aft drafts at the start of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageDrafts {
    pub fwd_m: f64,
    pub aft_m: f64,
}

impl StageDrafts {
    pub fn new(fwd_m: f64, aft_m: f64) -> Result<Self> {
        let drafts = Self { fwd_m, aft_m };
        drafts.validate()?;
        Ok(drafts)
    }

    pub fn validate(&self) -> Result<()> {
        for (value, field) in [(self.fwd_m, "fwd_draft_m"), (self.aft_m, "aft_draft_m")] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidStage {
                    message: format!("{field} must be finite and non-negative, got {value}"),
                });
            }
        }
        Ok(())
    }

    pub fn mean_m(&self) -> f64 {
        0.5 * (self.fwd_m + self.aft_m)
    }

    pub fn trim_m(&self) -> f64 {
        self.aft_m - self.fwd_m
    }
}

/// Predicted drafts after applying a set of mass changes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DraftPrediction {
    pub fwd_m: f64,
    pub aft_m: f64,
    pub mean_m: f64,
    /// Aft minus forward draft.
    pub trim_m: f64,
    pub delta_mean_m: f64,
    pub delta_trim_m: f64,
    /// Net mass added across all tanks (negative when discharging).
    pub total_delta_t: f64,
}

/// Predict drafts for per-tank net `deltas_t` (positive = fill) evaluated at `point`.
///
/// `deltas_t` must be in the same order as `tanks`.
pub fn predict_drafts(
    initial: StageDrafts,
    tanks: &TankSet,
    deltas_t: &[f64],
    point: &HydrostaticPoint,
) -> DraftPrediction {
    let arms = moment_arms(tanks, point);
    predict_with_arms(initial, &arms, deltas_t, point)
}

pub(crate) fn predict_with_arms(
    initial: StageDrafts,
    arms: &[f64],
    deltas_t: &[f64],
    point: &HydrostaticPoint,
) -> DraftPrediction {
    let total_delta_t: f64 = deltas_t.iter().sum();
    let total_moment = dot(deltas_t, arms);

    let delta_mean_m = total_delta_t / (point.tpc_t_per_cm * 100.0);
    let delta_trim_m = total_moment / (point.mtc_t_m_per_cm * 100.0);

    let fwd_m = initial.fwd_m + delta_mean_m - 0.5 * delta_trim_m;
    let aft_m = initial.aft_m + delta_mean_m + 0.5 * delta_trim_m;

    DraftPrediction {
        fwd_m,
        aft_m,
        mean_m: 0.5 * (fwd_m + aft_m),
        trim_m: aft_m - fwd_m,
        delta_mean_m,
        delta_trim_m,
        total_delta_t,
    }
}
