//! Stage configuration files.
//!
//! A stage file is JSON, either a single stage object or `{"stages": [...]}`.
//! Gate keys use the familiar column names (`FWD_MAX_m`, `UKC_MIN_m`, ...);
//! anything omitted stays unset and the matching gate is inactive.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};
use crate::formulation::TargetDrafts;
use crate::gate::{GateConfig, UkcParams, UkcReference};
use crate::predict::StageDrafts;

/// Drafts, gate limits and optional targets for one stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(alias = "FWD_m", alias = "Dfwd_m")]
    pub fwd_draft_m: f64,
    #[serde(alias = "AFT_m", alias = "Daft_m")]
    pub aft_draft_m: f64,
    #[serde(rename = "FWD_MAX_m", default)]
    pub fwd_max_m: Option<f64>,
    #[serde(rename = "AFT_MIN_m", default)]
    pub aft_min_m: Option<f64>,
    #[serde(rename = "D_vessel_m", default)]
    pub vessel_depth_m: Option<f64>,
    #[serde(rename = "FB_MIN_m", default)]
    pub freeboard_min_m: Option<f64>,
    #[serde(rename = "Forecast_Tide_m", alias = "Tide_m", default)]
    pub forecast_tide_m: Option<f64>,
    #[serde(rename = "DepthRef_m", default)]
    pub depth_ref_m: Option<f64>,
    #[serde(rename = "UKC_MIN_m", default)]
    pub ukc_min_m: Option<f64>,
    #[serde(rename = "Squat_m", default)]
    pub squat_m: Option<f64>,
    #[serde(rename = "Safety_m", default)]
    pub safety_m: Option<f64>,
    /// `fwd`, `aft`, `mean` or `max`; defaults to `max`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ukc_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_fwd_m: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_aft_m: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StageFile {
    Many { stages: Vec<StageConfig> },
    One(StageConfig),
}

impl StageConfig {
    /// Stage drafts with no gates configured.
    pub fn new(fwd_draft_m: f64, aft_draft_m: f64) -> Self {
        Self {
            name: None,
            fwd_draft_m,
            aft_draft_m,
            fwd_max_m: None,
            aft_min_m: None,
            vessel_depth_m: None,
            freeboard_min_m: None,
            forecast_tide_m: None,
            depth_ref_m: None,
            ukc_min_m: None,
            squat_m: None,
            safety_m: None,
            ukc_ref: None,
            target_fwd_m: None,
            target_aft_m: None,
        }
    }

    /// Display label, falling back to the 1-based position in the file.
    pub fn label(&self, index: usize) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("stage {}", index + 1))
    }

    pub fn drafts(&self) -> Result<StageDrafts> {
        StageDrafts::new(self.fwd_draft_m, self.aft_draft_m)
    }

    pub fn ukc_reference(&self) -> Result<UkcReference> {
        match &self.ukc_ref {
            Some(raw) => raw
                .parse()
                .map_err(|message| Error::InvalidStage { message }),
            None => Ok(UkcReference::default()),
        }
    }

    pub fn gates(&self) -> Result<GateConfig> {
        let gates = GateConfig {
            fwd_max_m: self.fwd_max_m,
            aft_min_m: self.aft_min_m,
            vessel_depth_m: self.vessel_depth_m,
            freeboard_min_m: self.freeboard_min_m,
            ukc: UkcParams {
                depth_ref_m: self.depth_ref_m,
                forecast_tide_m: self.forecast_tide_m,
                squat_m: self.squat_m,
                safety_m: self.safety_m,
                ukc_min_m: self.ukc_min_m,
                reference: self.ukc_reference()?,
            },
        };
        gates.validate()?;
        Ok(gates)
    }

    pub fn targets(&self) -> TargetDrafts {
        TargetDrafts {
            fwd_m: self.target_fwd_m,
            aft_m: self.target_aft_m,
        }
    }
}

/// Parse stage configurations from a JSON document.
pub fn stages_from_str(json: &str) -> Result<Vec<StageConfig>> {
    let stages = match serde_json::from_str::<StageFile>(json) {
        Ok(StageFile::Many { stages }) => stages,
        Ok(StageFile::One(stage)) => vec![stage],
        // Untagged errors are opaque; retry as a single stage for a useful message.
        Err(_) => vec![serde_json::from_str::<StageConfig>(json)?],
    };
    if stages.is_empty() {
        return Err(Error::InvalidStage {
            message: "stage file contains no stages".to_string(),
        });
    }
    Ok(stages)
}

/// Load stage configurations from a JSON file.
pub fn load_stages(path: &Path) -> Result<Vec<StageConfig>> {
    let json = fs::read_to_string(path)?;
    let stages = stages_from_str(&json)?;
    info!(path = %path.display(), stages = stages.len(), "loaded stage configuration");
    Ok(stages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateKind;

    #[test]
    fn parses_single_stage_with_column_names() {
        let json = r#"{
            "fwd_draft_m": 2.4,
            "aft_draft_m": 3.1,
            "FWD_MAX_m": 2.7,
            "AFT_MIN_m": 3.0,
            "D_vessel_m": 4.5,
            "FB_MIN_m": 0.6,
            "ukc_ref": "aft"
        }"#;
        let stages = stages_from_str(json).expect("parses");
        assert_eq!(stages.len(), 1);

        let gates = stages[0].gates().expect("valid gates");
        assert_eq!(gates.fwd_max_m, Some(2.7));
        assert_eq!(gates.ukc.reference, UkcReference::Aft);
        assert_eq!(stages[0].drafts().expect("drafts").mean_m(), 2.75);
        assert!(stages[0].targets().is_empty());
        assert_eq!(stages[0].label(0), "stage 1");
    }

    #[test]
    fn parses_stage_list() {
        let json = r#"{"stages": [
            {"name": "arrival", "fwd_draft_m": 2.0, "aft_draft_m": 2.5},
            {"fwd_draft_m": 2.2, "aft_draft_m": 2.6, "target_aft_m": 2.8}
        ]}"#;
        let stages = stages_from_str(json).expect("parses");
        assert_eq!(stages.len(), 2);
        assert_eq!(stages[0].label(0), "arrival");
        assert_eq!(stages[1].targets().aft_m, Some(2.8));
    }

    #[test]
    fn partial_ukc_keys_resolve_to_a_notice() {
        let mut stage = StageConfig::new(3.0, 3.0);
        stage.depth_ref_m = Some(6.0);
        stage.ukc_min_m = Some(0.5);

        let active = stage.gates().and_then(|g| g.resolve()).expect("resolves");
        assert!(active.rows.is_empty());
        assert_eq!(active.notices.len(), 1);
        assert_eq!(active.notices[0].gate, GateKind::Ukc);
        assert!(active.notices[0].missing.contains(&"Forecast_Tide_m"));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_reference() {
        let err = stages_from_str(r#"{"fwd_draft_m": 1.0, "aft_draft_m": 1.0, "FWD_MAXX": 2}"#)
            .unwrap_err();
        assert!(matches!(err, Error::Json(_)));

        let mut stage = StageConfig::new(3.0, 3.0);
        stage.ukc_ref = Some("keel".to_string());
        assert!(matches!(stage.gates(), Err(Error::InvalidStage { .. })));
    }

    #[test]
    fn rejects_empty_stage_list() {
        let err = stages_from_str(r#"{"stages": []}"#).unwrap_err();
        assert!(err.is_input_error());
    }
}
