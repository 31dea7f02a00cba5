//! Safety gates: configuration, activation and violation reporting.
//!
//! Four gates can be active at once: forward-max draft, aft-min draft,
//! freeboard and under-keel clearance (UKC). A gate whose parameters are all
//! unset is silently inactive. A gate whose parameters are only partially set
//! is deactivated and reported as a [`GateNotice`]; physical safety
//! parameters are never defaulted.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Error, Result};
use crate::predict::DraftPrediction;

/// Violations at or below this magnitude (metres) are reported as satisfied.
pub const VIOLATION_EPSILON_M: f64 = 1e-9;

/// Which draft the UKC gate is checked against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UkcReference {
    Fwd,
    Aft,
    Mean,
    /// Both forward and aft drafts must clear; emits two rows.
    #[default]
    MaxOfBoth,
}

impl fmt::Display for UkcReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            UkcReference::Fwd => "fwd",
            UkcReference::Aft => "aft",
            UkcReference::Mean => "mean",
            UkcReference::MaxOfBoth => "max",
        };
        f.pad(value)
    }
}

impl FromStr for UkcReference {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fwd" | "forward" | "fore" => Ok(UkcReference::Fwd),
            "aft" | "stern" => Ok(UkcReference::Aft),
            "mean" | "mid" => Ok(UkcReference::Mean),
            "max" | "both" | "max_of_both" | "max-of-both" => Ok(UkcReference::MaxOfBoth),
            other => Err(format!("unknown UKC reference '{other}'")),
        }
    }
}

/// Under-keel clearance parameters; all five values are required to activate the gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct UkcParams {
    pub depth_ref_m: Option<f64>,
    pub forecast_tide_m: Option<f64>,
    pub squat_m: Option<f64>,
    pub safety_m: Option<f64>,
    pub ukc_min_m: Option<f64>,
    #[serde(default)]
    pub reference: UkcReference,
}

impl UkcParams {
    fn fields(&self) -> [(Option<f64>, &'static str); 5] {
        [
            (self.depth_ref_m, "DepthRef_m"),
            (self.forecast_tide_m, "Forecast_Tide_m"),
            (self.squat_m, "Squat_m"),
            (self.safety_m, "Safety_m"),
            (self.ukc_min_m, "UKC_MIN_m"),
        ]
    }

    fn any_set(&self) -> bool {
        self.fields().iter().any(|(value, _)| value.is_some())
    }

    fn missing(&self) -> Vec<&'static str> {
        self.fields()
            .iter()
            .filter(|(value, _)| value.is_none())
            .map(|(_, name)| *name)
            .collect()
    }

    /// Clearance under the keel for `draft_m`, or `None` if any parameter is unset.
    ///
    /// `UKC = DepthRef + Tide − draft − Squat − Safety`
    pub fn clearance(&self, draft_m: f64) -> Option<f64> {
        Some(
            self.depth_ref_m? + self.forecast_tide_m? - draft_m - self.squat_m? - self.safety_m?,
        )
    }

    /// Deepest draft that still keeps `UKC_MIN_m` of clearance.
    pub fn allowable_draft(&self) -> Option<f64> {
        Some(self.clearance(0.0)? - self.ukc_min_m?)
    }
}

/// Freeboard remaining for `draft_m` on a hull of depth `vessel_depth_m`.
pub fn freeboard(vessel_depth_m: f64, draft_m: f64) -> f64 {
    vessel_depth_m - draft_m
}

/// Immutable gate configuration for one solve. Unset fields deactivate gates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct GateConfig {
    pub fwd_max_m: Option<f64>,
    pub aft_min_m: Option<f64>,
    pub vessel_depth_m: Option<f64>,
    pub freeboard_min_m: Option<f64>,
    #[serde(default)]
    pub ukc: UkcParams,
}

/// Identifies a gate in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateKind {
    FwdMax,
    AftMin,
    Freeboard,
    Ukc,
}

impl GateKind {
    /// Column label used in summary tables.
    pub fn label(self) -> &'static str {
        match self {
            GateKind::FwdMax => "viol_fwd_max_m",
            GateKind::AftMin => "viol_aft_min_m",
            GateKind::Freeboard => "viol_fb_m",
            GateKind::Ukc => "viol_ukc_m",
        }
    }
}

impl fmt::Display for GateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = match self {
            GateKind::FwdMax => "FWD max",
            GateKind::AftMin => "AFT min",
            GateKind::Freeboard => "freeboard",
            GateKind::Ukc => "UKC",
        };
        f.pad(value)
    }
}

/// Draft station a gate row constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStation {
    Fwd,
    Aft,
    Mean,
}

impl DraftStation {
    pub fn draft_of(self, prediction: &DraftPrediction) -> f64 {
        match self {
            DraftStation::Fwd => prediction.fwd_m,
            DraftStation::Aft => prediction.aft_m,
            DraftStation::Mean => prediction.mean_m,
        }
    }
}

/// Direction of a gate bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Sense {
    /// `draft <= limit`
    AtMost,
    /// `draft >= limit`
    AtLeast,
}

/// One scalar bound on one draft station, belonging to a gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GateRow {
    pub gate: GateKind,
    pub station: DraftStation,
    pub sense: Sense,
    pub limit_m: f64,
}

impl GateRow {
    /// Amount by which `prediction` breaks this row (0 when satisfied).
    pub fn violation(&self, prediction: &DraftPrediction) -> f64 {
        let draft = self.station.draft_of(prediction);
        match self.sense {
            Sense::AtMost => (draft - self.limit_m).max(0.0),
            Sense::AtLeast => (self.limit_m - draft).max(0.0),
        }
    }
}

/// Gate deactivated because its configuration was only partially supplied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateNotice {
    pub gate: GateKind,
    pub missing: Vec<&'static str>,
}

impl fmt::Display for GateNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} gate deactivated: missing {}",
            self.gate,
            self.missing.join(", ")
        )
    }
}

/// Gate rows to enforce plus any deactivation notices.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ActiveGates {
    pub rows: Vec<GateRow>,
    pub notices: Vec<GateNotice>,
}

impl ActiveGates {
    pub fn kinds(&self) -> Vec<GateKind> {
        let mut kinds: Vec<GateKind> = Vec::new();
        for row in &self.rows {
            if !kinds.contains(&row.gate) {
                kinds.push(row.gate);
            }
        }
        kinds
    }
}

impl GateConfig {
    /// Reject non-finite or physically meaningless values.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::InvalidStage { message });

        let finite = [
            (self.fwd_max_m, "FWD_MAX_m"),
            (self.aft_min_m, "AFT_MIN_m"),
            (self.ukc.forecast_tide_m, "Forecast_Tide_m"),
        ];
        for (value, field) in finite {
            if let Some(v) = value {
                if !v.is_finite() {
                    return invalid(format!("{field} must be finite, got {v}"));
                }
            }
        }

        let positive = [
            (self.vessel_depth_m, "D_vessel_m"),
            (self.ukc.depth_ref_m, "DepthRef_m"),
        ];
        for (value, field) in positive {
            if let Some(v) = value {
                if !v.is_finite() || v <= 0.0 {
                    return invalid(format!("{field} must be finite and positive, got {v}"));
                }
            }
        }

        let non_negative = [
            (self.freeboard_min_m, "FB_MIN_m"),
            (self.ukc.squat_m, "Squat_m"),
            (self.ukc.safety_m, "Safety_m"),
            (self.ukc.ukc_min_m, "UKC_MIN_m"),
        ];
        for (value, field) in non_negative {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return invalid(format!(
                        "{field} must be finite and non-negative, got {v}"
                    ));
                }
            }
        }

        Ok(())
    }

    /// Expand the configuration into gate rows, deactivating partial gates.
    pub fn resolve(&self) -> Result<ActiveGates> {
        self.validate()?;

        let mut active = ActiveGates::default();

        if let Some(limit_m) = self.fwd_max_m {
            active.rows.push(GateRow {
                gate: GateKind::FwdMax,
                station: DraftStation::Fwd,
                sense: Sense::AtMost,
                limit_m,
            });
        }

        if let Some(limit_m) = self.aft_min_m {
            active.rows.push(GateRow {
                gate: GateKind::AftMin,
                station: DraftStation::Aft,
                sense: Sense::AtLeast,
                limit_m,
            });
        }

        match (self.vessel_depth_m, self.freeboard_min_m) {
            (Some(depth), Some(fb_min)) => {
                let limit_m = depth - fb_min;
                for station in [DraftStation::Fwd, DraftStation::Aft] {
                    active.rows.push(GateRow {
                        gate: GateKind::Freeboard,
                        station,
                        sense: Sense::AtMost,
                        limit_m,
                    });
                }
            }
            (None, None) => {}
            (depth, fb_min) => {
                let mut missing = Vec::new();
                if depth.is_none() {
                    missing.push("D_vessel_m");
                }
                if fb_min.is_none() {
                    missing.push("FB_MIN_m");
                }
                active.notices.push(GateNotice {
                    gate: GateKind::Freeboard,
                    missing,
                });
            }
        }

        if let Some(limit_m) = self.ukc.allowable_draft() {
            let stations: &[DraftStation] = match self.ukc.reference {
                UkcReference::Fwd => &[DraftStation::Fwd],
                UkcReference::Aft => &[DraftStation::Aft],
                UkcReference::Mean => &[DraftStation::Mean],
                UkcReference::MaxOfBoth => &[DraftStation::Fwd, DraftStation::Aft],
            };
            for &station in stations {
                active.rows.push(GateRow {
                    gate: GateKind::Ukc,
                    station,
                    sense: Sense::AtMost,
                    limit_m,
                });
            }
        } else if self.ukc.any_set() {
            active.notices.push(GateNotice {
                gate: GateKind::Ukc,
                missing: self.ukc.missing(),
            });
        }

        for notice in &active.notices {
            warn!(gate = %notice.gate, missing = ?notice.missing, "gate deactivated");
        }

        Ok(active)
    }
}

/// Outcome of a single gate after the final iteration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "magnitude_m", rename_all = "snake_case")]
pub enum GateStatus {
    Satisfied,
    Violated(f64),
}

impl GateStatus {
    pub fn from_magnitude(magnitude_m: f64) -> Self {
        if magnitude_m > VIOLATION_EPSILON_M {
            GateStatus::Violated(magnitude_m)
        } else {
            GateStatus::Satisfied
        }
    }

    /// Violation magnitude in metres, 0 when satisfied.
    pub fn magnitude_m(&self) -> f64 {
        match self {
            GateStatus::Satisfied => 0.0,
            GateStatus::Violated(m) => *m,
        }
    }

    pub fn is_violated(&self) -> bool {
        matches!(self, GateStatus::Violated(_))
    }
}

/// Per-gate result reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GateReport {
    pub gate: GateKind,
    /// Draft limit shared by the gate's rows.
    pub limit_m: f64,
    pub status: GateStatus,
}

/// Evaluate every active gate against a prediction, worst row per gate.
pub fn evaluate_gates(active: &ActiveGates, prediction: &DraftPrediction) -> Vec<GateReport> {
    active
        .kinds()
        .into_iter()
        .map(|gate| {
            let rows = active.rows.iter().filter(|row| row.gate == gate);
            let mut worst: f64 = 0.0;
            let mut limit_m = f64::NAN;
            for row in rows {
                worst = worst.max(row.violation(prediction));
                limit_m = row.limit_m;
            }
            GateReport {
                gate,
                limit_m,
                status: GateStatus::from_magnitude(worst),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction(fwd: f64, aft: f64) -> DraftPrediction {
        DraftPrediction {
            fwd_m: fwd,
            aft_m: aft,
            mean_m: 0.5 * (fwd + aft),
            trim_m: aft - fwd,
            delta_mean_m: 0.0,
            delta_trim_m: 0.0,
            total_delta_t: 0.0,
        }
    }

    fn full_ukc(reference: UkcReference) -> UkcParams {
        UkcParams {
            depth_ref_m: Some(6.0),
            forecast_tide_m: Some(0.5),
            squat_m: Some(0.2),
            safety_m: Some(0.3),
            ukc_min_m: Some(0.5),
            reference,
        }
    }

    #[test]
    fn empty_config_activates_nothing() {
        let active = GateConfig::default().resolve().expect("resolve");
        assert!(active.rows.is_empty());
        assert!(active.notices.is_empty());
    }

    #[test]
    fn aft_min_row_is_a_lower_bound() {
        let config = GateConfig {
            aft_min_m: Some(3.0),
            ..GateConfig::default()
        };
        let active = config.resolve().expect("resolve");
        assert_eq!(active.rows.len(), 1);
        assert_eq!(active.rows[0].sense, Sense::AtLeast);
        assert!((active.rows[0].violation(&prediction(2.0, 2.6)) - 0.4).abs() < 1e-12);
        assert_eq!(active.rows[0].violation(&prediction(2.0, 3.2)), 0.0);
    }

    #[test]
    fn freeboard_emits_two_rows() {
        let config = GateConfig {
            vessel_depth_m: Some(4.0),
            freeboard_min_m: Some(0.5),
            ..GateConfig::default()
        };
        let active = config.resolve().expect("resolve");
        assert_eq!(active.rows.len(), 2);
        assert!(active.rows.iter().all(|row| row.limit_m == 3.5));
        assert_eq!(active.kinds(), vec![GateKind::Freeboard]);
    }

    #[test]
    fn partial_freeboard_is_deactivated_with_notice() {
        let config = GateConfig {
            vessel_depth_m: Some(4.0),
            ..GateConfig::default()
        };
        let active = config.resolve().expect("resolve");
        assert!(active.rows.is_empty());
        assert_eq!(
            active.notices,
            vec![GateNotice {
                gate: GateKind::Freeboard,
                missing: vec!["FB_MIN_m"],
            }]
        );
    }

    #[test]
    fn partial_ukc_lists_missing_parameters() {
        let config = GateConfig {
            ukc: UkcParams {
                forecast_tide_m: Some(1.2),
                ..UkcParams::default()
            },
            ..GateConfig::default()
        };
        let active = config.resolve().expect("resolve");
        assert!(active.rows.is_empty());
        let notice = &active.notices[0];
        assert_eq!(notice.gate, GateKind::Ukc);
        assert!(notice.missing.contains(&"DepthRef_m"));
        assert!(notice.missing.contains(&"UKC_MIN_m"));
        assert!(!notice.missing.contains(&"Forecast_Tide_m"));
        assert!(notice.to_string().contains("UKC gate deactivated"));
    }

    #[test]
    fn ukc_reference_controls_rows() {
        for (reference, stations) in [
            (UkcReference::Fwd, vec![DraftStation::Fwd]),
            (UkcReference::Aft, vec![DraftStation::Aft]),
            (UkcReference::Mean, vec![DraftStation::Mean]),
            (
                UkcReference::MaxOfBoth,
                vec![DraftStation::Fwd, DraftStation::Aft],
            ),
        ] {
            let config = GateConfig {
                ukc: full_ukc(reference),
                ..GateConfig::default()
            };
            let active = config.resolve().expect("resolve");
            let got: Vec<DraftStation> = active.rows.iter().map(|row| row.station).collect();
            assert_eq!(got, stations);
            // 6.0 + 0.5 - 0.2 - 0.3 - 0.5
            assert!((active.rows[0].limit_m - 5.5).abs() < 1e-12);
        }
    }

    #[test]
    fn clearance_grows_with_tide() {
        let mut params = full_ukc(UkcReference::Mean);
        let mut previous = f64::NEG_INFINITY;
        for tide in [-0.5, 0.0, 0.3, 1.0, 2.5] {
            params.forecast_tide_m = Some(tide);
            let ukc = params.clearance(5.0).expect("complete params");
            assert!(ukc >= previous);
            previous = ukc;
        }
        assert!(UkcParams::default().clearance(5.0).is_none());
    }

    #[test]
    fn evaluate_reports_worst_row_per_gate() {
        let config = GateConfig {
            vessel_depth_m: Some(4.0),
            freeboard_min_m: Some(0.5),
            fwd_max_m: Some(3.6),
            ..GateConfig::default()
        };
        let active = config.resolve().expect("resolve");
        let reports = evaluate_gates(&active, &prediction(3.4, 3.8));

        let fb = reports
            .iter()
            .find(|r| r.gate == GateKind::Freeboard)
            .expect("freeboard report");
        assert!((fb.status.magnitude_m() - 0.3).abs() < 1e-12);

        let fwd = reports
            .iter()
            .find(|r| r.gate == GateKind::FwdMax)
            .expect("fwd report");
        assert_eq!(fwd.status, GateStatus::Satisfied);
    }

    #[test]
    fn rejects_invalid_values() {
        let config = GateConfig {
            vessel_depth_m: Some(-4.0),
            freeboard_min_m: Some(0.5),
            ..GateConfig::default()
        };
        assert!(config.resolve().is_err());

        let config = GateConfig {
            fwd_max_m: Some(f64::INFINITY),
            ..GateConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn freeboard_helper_is_depth_minus_draft() {
        assert_eq!(freeboard(10.0, 7.5), 2.5);
    }

    #[test]
    fn labels_respect_format_width() {
        assert_eq!(format!("{:<10}|", GateKind::Ukc), "UKC       |");
        assert_eq!(format!("{:<6}|", UkcReference::Mean), "mean  |");
    }
}
