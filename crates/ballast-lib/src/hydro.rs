//! Hydrostatic table handling and linear interpolation.
//!
//! The table maps mean draft to the coefficients that linearize the vessel's
//! response to a mass change: tons per centimetre immersion (TPC), moment to
//! change trim (MTC) and the longitudinal centre of flotation (LCF). Queries
//! outside the sampled draft range are clamped to the boundary row and the
//! clamp is reported alongside the interpolated point.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{require_finite, Error, Result};

/// One sampled row of the hydrostatic table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HydrostaticRow {
    pub mean_draft_m: f64,
    /// Tons per centimetre immersion.
    pub tpc_t_per_cm: f64,
    /// Moment to change trim one centimetre (t·m/cm).
    pub mtc_t_m_per_cm: f64,
    /// Longitudinal centre of flotation from midship, positive aft.
    pub lcf_m: f64,
    /// Length between perpendiculars.
    pub lbp_m: f64,
}

impl HydrostaticRow {
    fn validate(&self, row: usize) -> Result<()> {
        let invalid = |message: String| Error::InvalidHydrostatics { row, message };

        require_finite(self.mean_draft_m, "Tmean_m").map_err(invalid)?;
        require_finite(self.lcf_m, "LCF_m").map_err(invalid)?;

        let positive = [
            (self.tpc_t_per_cm, "TPC_t_per_cm"),
            (self.mtc_t_m_per_cm, "MTC_t_m_per_cm"),
            (self.lbp_m, "LBP_m"),
        ];
        for (value, field) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(invalid(format!(
                    "{field} must be a finite positive number, got {value}"
                )));
            }
        }

        Ok(())
    }
}

/// Hydrostatic coefficients evaluated at a single mean draft.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HydrostaticPoint {
    /// Mean draft the point was requested for.
    pub mean_draft_m: f64,
    pub tpc_t_per_cm: f64,
    pub mtc_t_m_per_cm: f64,
    pub lcf_m: f64,
    pub lbp_m: f64,
}

impl From<HydrostaticRow> for HydrostaticPoint {
    fn from(row: HydrostaticRow) -> Self {
        Self {
            mean_draft_m: row.mean_draft_m,
            tpc_t_per_cm: row.tpc_t_per_cm,
            mtc_t_m_per_cm: row.mtc_t_m_per_cm,
            lcf_m: row.lcf_m,
            lbp_m: row.lbp_m,
        }
    }
}

/// Records that a query fell outside the table and was clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "side", rename_all = "snake_case")]
pub enum HydroClamp {
    /// Query was shallower than the first row.
    Below { boundary_draft_m: f64 },
    /// Query was deeper than the last row.
    Above { boundary_draft_m: f64 },
}

/// Result of a table lookup: the point plus clamp metadata.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Interpolation {
    pub point: HydrostaticPoint,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clamp: Option<HydroClamp>,
}

/// Validated hydrostatic table sorted by strictly increasing mean draft.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HydrostaticTable {
    rows: Vec<HydrostaticRow>,
}

impl HydrostaticTable {
    /// Validate and wrap a set of rows.
    ///
    /// Rows must be finite, have positive TPC/MTC/LBP and be sorted by
    /// strictly increasing mean draft.
    pub fn new(rows: Vec<HydrostaticRow>) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::EmptyHydrostatics);
        }

        for (index, row) in rows.iter().enumerate() {
            row.validate(index + 1)?;
        }

        for (index, pair) in rows.windows(2).enumerate() {
            if pair[1].mean_draft_m <= pair[0].mean_draft_m {
                return Err(Error::NonMonotonicHydrostatics {
                    row: index + 2,
                    draft: pair[1].mean_draft_m,
                    previous: pair[0].mean_draft_m,
                });
            }
        }

        Ok(Self { rows })
    }

    pub fn rows(&self) -> &[HydrostaticRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Inclusive draft range covered by the table.
    pub fn draft_range(&self) -> (f64, f64) {
        let first = self.rows[0].mean_draft_m;
        let last = self.rows[self.rows.len() - 1].mean_draft_m;
        (first, last)
    }

    /// Linearly interpolate coefficients at `mean_draft_m`.
    ///
    /// Outside the table the boundary row's coefficients are returned
    /// unchanged and the clamp is recorded in [`Interpolation::clamp`].
    pub fn interpolate(&self, mean_draft_m: f64) -> Result<Interpolation> {
        if !mean_draft_m.is_finite() {
            return Err(Error::InvalidStage {
                message: format!("mean draft query must be finite, got {mean_draft_m}"),
            });
        }

        let first = self.rows[0];
        let last = self.rows[self.rows.len() - 1];

        if mean_draft_m < first.mean_draft_m {
            warn!(
                query = mean_draft_m,
                boundary = first.mean_draft_m,
                "mean draft below hydrostatic table range; clamping"
            );
            return Ok(clamped(
                first,
                mean_draft_m,
                HydroClamp::Below {
                    boundary_draft_m: first.mean_draft_m,
                },
            ));
        }

        if mean_draft_m > last.mean_draft_m {
            warn!(
                query = mean_draft_m,
                boundary = last.mean_draft_m,
                "mean draft above hydrostatic table range; clamping"
            );
            return Ok(clamped(
                last,
                mean_draft_m,
                HydroClamp::Above {
                    boundary_draft_m: last.mean_draft_m,
                },
            ));
        }

        // First row strictly deeper than the query; the bracket is (upper - 1, upper).
        let upper = self
            .rows
            .partition_point(|row| row.mean_draft_m <= mean_draft_m);

        let point = if upper >= self.rows.len() {
            HydrostaticPoint::from(last)
        } else {
            let lo = self.rows[upper - 1];
            let hi = self.rows[upper];
            let t = (mean_draft_m - lo.mean_draft_m) / (hi.mean_draft_m - lo.mean_draft_m);
            HydrostaticPoint {
                mean_draft_m,
                tpc_t_per_cm: lerp(lo.tpc_t_per_cm, hi.tpc_t_per_cm, t),
                mtc_t_m_per_cm: lerp(lo.mtc_t_m_per_cm, hi.mtc_t_m_per_cm, t),
                lcf_m: lerp(lo.lcf_m, hi.lcf_m, t),
                lbp_m: lerp(lo.lbp_m, hi.lbp_m, t),
            }
        };

        Ok(Interpolation { point, clamp: None })
    }
}

fn clamped(row: HydrostaticRow, query: f64, clamp: HydroClamp) -> Interpolation {
    Interpolation {
        point: HydrostaticPoint {
            mean_draft_m: query,
            ..HydrostaticPoint::from(row)
        },
        clamp: Some(clamp),
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}
