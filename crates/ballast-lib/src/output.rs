//! Tabular and JSON writers for solved stages.

use std::io::Write;

use serde::Serialize;

use crate::error::Result;
use crate::hydro::{HydroClamp, Interpolation};
use crate::solution::Solution;
use crate::tank::TankSet;

const PLAN_HEADERS: [&str; 4] = ["Tank", "Action", "Delta_t", "PumpTime_h"];
const SUMMARY_HEADERS: [&str; 9] = [
    "FWD_new_m",
    "AFT_new_m",
    "Trim_new_m",
    "Tmean_new_m",
    "Total_Delta_t",
    "viol_fwd_max_m",
    "viol_aft_min_m",
    "viol_fb_m",
    "viol_ukc_m",
];
const TANK_HEADERS: [&str; 11] = [
    "Tank",
    "Mode",
    "Capacity_t",
    "x_from_mid_m",
    "Current_t",
    "Min_t",
    "Max_t",
    "pump_rate_tph",
    "priority_weight",
    "Fill_max_t",
    "Discharge_max_t",
];
const HYDRO_HEADERS: [&str; 6] = [
    "Tmean_m",
    "TPC_t_per_cm",
    "MTC_t_m_per_cm",
    "LCF_m",
    "LBP_m",
    "Clamped_to_m",
];

/// A labelled stage solution ready to be written.
#[derive(Debug, Clone, Copy)]
pub struct StageOutput<'a> {
    pub label: &'a str,
    pub solution: &'a Solution,
}

/// Write the ballast plan table. A leading `Stage` column is added when more
/// than one stage is written.
pub fn write_plan_csv<W: Write>(writer: W, stages: &[StageOutput<'_>]) -> Result<()> {
    let staged = stages.len() > 1;
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(header(staged, &PLAN_HEADERS))?;

    for stage in stages {
        for row in stage.solution.plan_rows() {
            let mut record = Vec::with_capacity(5);
            if staged {
                record.push(stage.label.to_string());
            }
            record.push(row.tank);
            record.push(row.action.to_string());
            record.push(row.delta_t.to_string());
            record.push(row.pump_time_h.to_string());
            csv.write_record(&record)?;
        }
    }

    csv.flush()?;
    Ok(())
}

/// Write the per-stage summary table. Violation cells are empty for
/// inactive gates.
pub fn write_summary_csv<W: Write>(writer: W, stages: &[StageOutput<'_>]) -> Result<()> {
    let staged = stages.len() > 1;
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(header(staged, &SUMMARY_HEADERS))?;

    for stage in stages {
        let summary = stage.solution.summary();
        let mut record = Vec::with_capacity(10);
        if staged {
            record.push(stage.label.to_string());
        }
        record.extend(
            [
                summary.fwd_new_m,
                summary.aft_new_m,
                summary.trim_new_m,
                summary.tmean_new_m,
                summary.total_delta_t,
            ]
            .iter()
            .map(f64::to_string),
        );
        record.extend(
            [
                summary.viol_fwd_max_m,
                summary.viol_aft_min_m,
                summary.viol_fb_m,
                summary.viol_ukc_m,
            ]
            .iter()
            .map(|v| v.map(|m| m.to_string()).unwrap_or_default()),
        );
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

/// Write the usable tanks with their derived transfer bounds.
///
/// Column names match the tank loader, so the output can be read back as a
/// tank table; the two bound columns are ignored on load.
pub fn write_tanks_csv<W: Write>(writer: W, tanks: &TankSet) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(TANK_HEADERS)?;

    for tank in tanks.tanks() {
        let bounds = TankSet::bounds(tank);
        let mut record = vec![tank.id.clone(), tank.mode.to_string()];
        record.extend(
            [
                tank.capacity_t,
                tank.x_from_mid_m,
                tank.current_t,
                tank.min_t,
                tank.max_t,
                tank.pump_rate_tph,
                tank.priority_weight,
                bounds.fill_upper,
                bounds.discharge_upper,
            ]
            .iter()
            .map(f64::to_string),
        );
        csv.write_record(&record)?;
    }

    csv.flush()?;
    Ok(())
}

/// Write one hydrostatic lookup as a single-row table. `Clamped_to_m` holds
/// the boundary draft when the query fell outside the table.
pub fn write_interpolation_csv<W: Write>(writer: W, interpolation: &Interpolation) -> Result<()> {
    let point = &interpolation.point;
    let clamped = match interpolation.clamp {
        Some(HydroClamp::Below { boundary_draft_m } | HydroClamp::Above { boundary_draft_m }) => {
            boundary_draft_m.to_string()
        }
        None => String::new(),
    };

    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(HYDRO_HEADERS)?;
    let mut record: Vec<String> = [
        point.mean_draft_m,
        point.tpc_t_per_cm,
        point.mtc_t_m_per_cm,
        point.lcf_m,
        point.lbp_m,
    ]
    .iter()
    .map(f64::to_string)
    .collect();
    record.push(clamped);
    csv.write_record(&record)?;

    csv.flush()?;
    Ok(())
}

/// Write any serializable value as pretty-printed JSON.
pub fn write_json<W: Write, T: Serialize + ?Sized>(mut writer: W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writeln!(writer)?;
    Ok(())
}

fn header<'h>(staged: bool, columns: &[&'h str]) -> Vec<&'h str> {
    let mut record = Vec::with_capacity(columns.len() + 1);
    if staged {
        record.push("Stage");
    }
    record.extend_from_slice(columns);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::{GateConfig, GateKind};
    use crate::hydro::{HydrostaticRow, HydrostaticTable};
    use crate::predict::StageDrafts;
    use crate::refine::{RefinementController, StageProblem};
    use crate::tank::fixtures::tank;
    use crate::tank::{TankMode, TankSet};

    fn solved(gates: GateConfig) -> Solution {
        let tanks = TankSet::new(vec![
            tank("FPK", -25.0, 40.0, TankMode::Bidirectional),
            tank("APK", 25.0, 40.0, TankMode::Bidirectional),
        ])
        .expect("valid");
        let table = HydrostaticTable::new(vec![HydrostaticRow {
            mean_draft_m: 3.0,
            tpc_t_per_cm: 10.0,
            mtc_t_m_per_cm: 50.0,
            lcf_m: 0.0,
            lbp_m: 60.0,
        }])
        .expect("valid");
        let stage = StageProblem::new(
            &tanks,
            &table,
            StageDrafts::new(3.0, 3.0).expect("drafts"),
            gates,
        );
        RefinementController::default().solve(&stage).expect("solved")
    }

    #[test]
    fn plan_lists_only_moving_tanks() {
        let solution = solved(GateConfig {
            aft_min_m: Some(3.05),
            ..GateConfig::default()
        });
        let mut buffer = Vec::new();
        write_plan_csv(
            &mut buffer,
            &[StageOutput {
                label: "s1",
                solution: &solution,
            }],
        )
        .expect("written");

        let text = String::from_utf8(buffer).expect("utf8");
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("Tank,Action,Delta_t,PumpTime_h"));
        assert!(text.contains("APK,fill,"));
        assert!(!text.contains("FPK"));
    }

    #[test]
    fn summary_leaves_inactive_gates_blank() {
        let solution = solved(GateConfig {
            fwd_max_m: Some(3.5),
            ..GateConfig::default()
        });
        assert_eq!(solution.violation(GateKind::FwdMax), Some(0.0));

        let mut buffer = Vec::new();
        let stage = StageOutput {
            label: "arrival",
            solution: &solution,
        };
        write_summary_csv(&mut buffer, &[stage, stage]).expect("written");

        let text = String::from_utf8(buffer).expect("utf8");
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("Stage,FWD_new_m,"));
        assert!(lines[1].starts_with("arrival,3,3,0,3,0,0,,,"));
    }

    #[test]
    fn interpolation_row_records_clamp_boundary() {
        let table = HydrostaticTable::new(vec![
            HydrostaticRow {
                mean_draft_m: 2.0,
                tpc_t_per_cm: 9.0,
                mtc_t_m_per_cm: 40.0,
                lcf_m: -0.5,
                lbp_m: 60.0,
            },
            HydrostaticRow {
                mean_draft_m: 4.0,
                tpc_t_per_cm: 11.0,
                mtc_t_m_per_cm: 50.0,
                lcf_m: -1.5,
                lbp_m: 60.0,
            },
        ])
        .expect("valid");

        let mut inside = Vec::new();
        write_interpolation_csv(&mut inside, &table.interpolate(3.0).expect("lookup"))
            .expect("written");
        let inside = String::from_utf8(inside).expect("utf8");
        assert_eq!(
            inside,
            "Tmean_m,TPC_t_per_cm,MTC_t_m_per_cm,LCF_m,LBP_m,Clamped_to_m\n3,10,45,-1,60,\n"
        );

        let mut above = Vec::new();
        write_interpolation_csv(&mut above, &table.interpolate(5.0).expect("lookup"))
            .expect("written");
        let above = String::from_utf8(above).expect("utf8");
        assert!(above.lines().nth(1).is_some_and(|row| row.ends_with(",4")));
    }

    #[test]
    fn json_is_newline_terminated() {
        let mut buffer = Vec::new();
        write_json(&mut buffer, &serde_json::json!({"ok": true})).expect("written");
        assert!(buffer.ends_with(b"}\n"));
    }
}
