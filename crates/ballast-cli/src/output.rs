//! Rendering of solved stages for the terminal and for machine consumers.

use std::io::{self, Write};

use clap::ValueEnum;
use serde::Serialize;

use ballast_lib::{
    Error as LibError, GateStatus, HydroClamp, Interpolation, IterationResult, Solution,
    TransferAction,
};

use crate::terminal::{format_tons, ColorPalette};

/// Output format for stage results written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable report.
    #[default]
    Text,
    /// Full JSON document including per-iteration results.
    Json,
    /// Summary table as CSV.
    Csv,
}

/// JSON view of one stage outcome.
#[derive(Debug, Serialize)]
pub struct StageReport<'a> {
    pub stage: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<&'a Solution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partial: Option<&'a IterationResult>,
}

impl<'a> StageReport<'a> {
    pub fn new(stage: &'a str, outcome: &'a Result<Solution, LibError>) -> Self {
        match outcome {
            Ok(solution) => Self {
                stage,
                solution: Some(solution),
                error: None,
                partial: None,
            },
            Err(err) => Self {
                stage,
                solution: None,
                error: Some(err.to_string()),
                partial: err.partial_result(),
            },
        }
    }
}

/// Render a solved stage as a text report.
pub fn render_solution<W: Write>(
    out: &mut W,
    label: &str,
    solution: &Solution,
    palette: &ColorPalette,
) -> io::Result<()> {
    let p = palette;
    let plan = solution.plan_rows();
    let moved: f64 = solution.transfers.iter().map(|t| t.pumped_t).sum();

    writeln!(
        out,
        "{}Stage {}{}: {} tank(s) moving, {} t pumped, {:.2} h pumping ({} cost, {} iteration(s))",
        p.white_bold,
        label,
        p.reset,
        plan.len(),
        format_tons(moved),
        solution.total_pump_time_h(),
        solution.cost_mode,
        solution.iterations.len(),
    )?;

    if plan.is_empty() {
        writeln!(out, "  {}No transfers required.{}", p.gray, p.reset)?;
    } else {
        writeln!(
            out,
            "  {:<12} {:<10} {:>12} {:>11}",
            "Tank", "Action", "Delta (t)", "Pump (h)"
        )?;
        for row in &plan {
            let color = match row.action {
                TransferAction::Fill => p.green,
                TransferAction::Discharge => p.cyan,
                TransferAction::Hold => p.gray,
            };
            writeln!(
                out,
                "  {:<12} {}{:<10}{} {:>12} {:>11.2}",
                row.tank,
                color,
                row.action,
                p.reset,
                format_tons(row.delta_t),
                row.pump_time_h
            )?;
        }
    }

    let initial = &solution.initial;
    let predicted = &solution.prediction;
    writeln!(
        out,
        "  Drafts: FWD {c}{:.3}{r} -> {c}{:.3}{r} m, AFT {c}{:.3}{r} -> {c}{:.3}{r} m, trim {:+.3} -> {:+.3} m, mean {:.3} m",
        initial.fwd_m,
        predicted.fwd_m,
        initial.aft_m,
        predicted.aft_m,
        initial.trim_m(),
        predicted.trim_m,
        predicted.mean_m,
        c = p.cyan,
        r = p.reset,
    )?;

    for report in &solution.gates {
        match report.status {
            GateStatus::Satisfied => writeln!(
                out,
                "  Gate {:<10} limit {:.3} m  {}ok{}",
                report.gate,
                report.limit_m,
                p.green,
                p.reset
            )?,
            GateStatus::Violated(magnitude) => writeln!(
                out,
                "  Gate {:<10} limit {:.3} m  {}VIOLATED by {:.3} m{}",
                report.gate,
                report.limit_m,
                p.red,
                magnitude,
                p.reset
            )?,
        }
    }

    for notice in &solution.notices {
        writeln!(out, "  {}Notice: {}{}", p.yellow, notice, p.reset)?;
    }

    render_hydrostatics(out, "  Hydrostatics", &solution.hydrostatics, palette)?;
    Ok(())
}

/// Render a failed stage, including the last solved iteration when available.
pub fn render_failure<W: Write>(
    out: &mut W,
    label: &str,
    err: &LibError,
    palette: &ColorPalette,
) -> io::Result<()> {
    let p = palette;
    writeln!(out, "{}Stage {} failed:{} {}", p.red, label, p.reset, err)?;
    if let Some(partial) = err.partial_result() {
        writeln!(
            out,
            "  Last solved iteration {}: FWD {:.3} m, AFT {:.3} m, total delta {} t",
            partial.iteration,
            partial.prediction.fwd_m,
            partial.prediction.aft_m,
            format_tons(partial.prediction.total_delta_t),
        )?;
    }
    Ok(())
}

/// Render one hydrostatic lookup line.
pub fn render_hydrostatics<W: Write>(
    out: &mut W,
    heading: &str,
    interpolation: &Interpolation,
    palette: &ColorPalette,
) -> io::Result<()> {
    let point = &interpolation.point;
    write!(
        out,
        "{}: Tmean {:.3} m, TPC {:.3} t/cm, MTC {:.3} t·m/cm, LCF {:+.3} m, LBP {:.2} m",
        heading,
        point.mean_draft_m,
        point.tpc_t_per_cm,
        point.mtc_t_m_per_cm,
        point.lcf_m,
        point.lbp_m
    )?;
    match interpolation.clamp {
        Some(HydroClamp::Below { boundary_draft_m }) => writeln!(
            out,
            " {}(clamped to lowest table draft {:.3} m){}",
            palette.yellow, boundary_draft_m, palette.reset
        ),
        Some(HydroClamp::Above { boundary_draft_m }) => writeln!(
            out,
            " {}(clamped to highest table draft {:.3} m){}",
            palette.yellow, boundary_draft_m, palette.reset
        ),
        None => writeln!(out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ballast_lib::{
        GateConfig, HydrostaticRow, HydrostaticTable, RefinementController, StageDrafts,
        StageProblem, Tank, TankMode, TankSet,
    };

    fn tank(id: &str, x: f64) -> Tank {
        Tank {
            id: id.to_string(),
            capacity_t: 100.0,
            x_from_mid_m: x,
            current_t: 40.0,
            min_t: 0.0,
            max_t: 100.0,
            mode: TankMode::Bidirectional,
            pump_rate_tph: 50.0,
            priority_weight: 1.0,
        }
    }

    fn solve(gates: GateConfig) -> Solution {
        let tanks = TankSet::new(vec![tank("FPK", -25.0), tank("APK", 25.0)]).expect("tanks");
        let table = HydrostaticTable::new(vec![HydrostaticRow {
            mean_draft_m: 3.0,
            tpc_t_per_cm: 10.0,
            mtc_t_m_per_cm: 50.0,
            lcf_m: 0.0,
            lbp_m: 60.0,
        }])
        .expect("table");
        let stage = StageProblem::new(
            &tanks,
            &table,
            StageDrafts::new(3.0, 3.0).expect("drafts"),
            gates,
        );
        RefinementController::default().solve(&stage).expect("solved")
    }

    #[test]
    fn renders_plan_and_gates_without_color() {
        let solution = solve(GateConfig {
            aft_min_m: Some(3.05),
            ..GateConfig::default()
        });

        let mut buffer = Vec::new();
        render_solution(&mut buffer, "load", &solution, &ColorPalette::plain()).expect("render");
        let text = String::from_utf8(buffer).expect("utf8");

        assert!(text.contains("Stage load: 1 tank(s) moving"));
        assert!(text.contains("APK"));
        assert!(text.contains(&format!("  {:<12} {:<10} ", "APK", "fill")));
        assert!(text.contains("Gate AFT min    limit"));
        assert!(text.contains("ok"));
        assert!(!text.contains('\x1b'));
    }

    #[test]
    fn json_report_carries_error_text() {
        let outcome: Result<Solution, LibError> = Err(LibError::EmptyTankSet);
        let report = StageReport::new("s1", &outcome);
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json["stage"], "s1");
        assert!(json.get("solution").is_none());
        assert!(json["error"].as_str().is_some_and(|e| e.contains("empty")));
    }
}
