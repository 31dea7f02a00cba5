//! Solve command handler: plan ballast transfers for every configured stage.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;

use ballast_lib::output::{write_json, write_plan_csv, write_summary_csv, StageOutput};
use ballast_lib::refine::DEFAULT_ITERATIONS;
use ballast_lib::{
    load_hydrostatics, load_stages, load_tanks, CostMode, RefinementController,
    RefinementOptions, SimplexSolver, StageProblem,
};
use tracing::info;

use crate::output::{render_failure, render_solution, OutputFormat, StageReport};
use crate::terminal::ColorPalette;

#[derive(Args, Debug, Clone)]
pub struct SolveArgs {
    /// Tank table (CSV).
    #[arg(long = "tanks", env = "BALLAST_TANKS")]
    pub tanks: PathBuf,

    /// Hydrostatic table (CSV).
    #[arg(long = "hydro", env = "BALLAST_HYDRO")]
    pub hydro: PathBuf,

    /// Stage configuration (JSON).
    #[arg(long = "stage", env = "BALLAST_STAGE")]
    pub stage: PathBuf,

    /// Number of hydrostatic refinement iterations.
    #[arg(long, default_value_t = DEFAULT_ITERATIONS)]
    pub iterations: usize,

    /// Stop early once the mean-draft estimate moves less than this (m).
    #[arg(long)]
    pub tolerance: Option<f64>,

    /// Transfer cost: `weight` (tons) or `time` (pump hours).
    #[arg(long, default_value_t = CostMode::Weight)]
    pub cost_mode: CostMode,

    /// Simplex pivot budget per LP solve.
    #[arg(long)]
    pub max_pivots: Option<usize>,

    /// Output format for stdout.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Write the ballast plan table (CSV) to this path.
    #[arg(long)]
    pub plan_out: Option<PathBuf>,

    /// Write the stage summary table (CSV) to this path.
    #[arg(long)]
    pub summary_out: Option<PathBuf>,
}

impl SolveArgs {
    fn options(&self) -> RefinementOptions {
        RefinementOptions {
            iterations: self.iterations,
            tolerance_m: self.tolerance,
            cost_mode: self.cost_mode,
            ..RefinementOptions::default()
        }
    }

    fn solver(&self) -> SimplexSolver {
        match self.max_pivots {
            Some(limit) => SimplexSolver::with_max_pivots(limit),
            None => SimplexSolver::new(),
        }
    }
}

/// Handle the solve subcommand.
///
/// Gate violations are reported but do not fail the command; any stage that
/// cannot be solved makes the command exit non-zero after all stages are
/// reported.
pub fn handle_solve(args: &SolveArgs, palette: &ColorPalette) -> Result<()> {
    let options = args.options();
    options
        .validate()
        .context("invalid refinement options")?;

    let loaded = load_tanks(&args.tanks)
        .with_context(|| format!("failed to load tank table from {}", args.tanks.display()))?;
    let table = load_hydrostatics(&args.hydro).with_context(|| {
        format!(
            "failed to load hydrostatic table from {}",
            args.hydro.display()
        )
    })?;
    let configs = load_stages(&args.stage).with_context(|| {
        format!(
            "failed to load stage configuration from {}",
            args.stage.display()
        )
    })?;

    let mut labels = Vec::with_capacity(configs.len());
    let mut problems = Vec::with_capacity(configs.len());
    for (index, config) in configs.iter().enumerate() {
        let label = config.label(index);
        let drafts = config
            .drafts()
            .with_context(|| format!("invalid drafts for {label}"))?;
        let gates = config
            .gates()
            .with_context(|| format!("invalid gate configuration for {label}"))?;
        problems.push(
            StageProblem::new(&loaded.tanks, &table, drafts, gates).with_targets(config.targets()),
        );
        labels.push(label);
    }

    let controller = RefinementController::with_solver(args.solver(), options);
    let outcomes = controller.solve_stages(&problems);

    let solved: Vec<StageOutput<'_>> = labels
        .iter()
        .zip(&outcomes)
        .filter_map(|(label, outcome)| {
            outcome.as_ref().ok().map(|solution| StageOutput {
                label: label.as_str(),
                solution,
            })
        })
        .collect();

    info!(
        stages = outcomes.len(),
        solved = solved.len(),
        with_violations = solved.iter().filter(|s| s.solution.has_violations()).count(),
        "stage planning finished"
    );

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Text => {
            for (label, outcome) in labels.iter().zip(&outcomes) {
                match outcome {
                    Ok(solution) => render_solution(&mut out, label, solution, palette)?,
                    Err(err) => render_failure(&mut out, label, err, palette)?,
                }
            }
        }
        OutputFormat::Json => {
            let reports: Vec<StageReport<'_>> = labels
                .iter()
                .zip(&outcomes)
                .map(|(label, outcome)| StageReport::new(label, outcome))
                .collect();
            write_json(&mut out, &reports)?;
        }
        OutputFormat::Csv => write_summary_csv(&mut out, &solved)?,
    }
    out.flush()?;

    if let Some(path) = &args.plan_out {
        write_table(path, |file| write_plan_csv(file, &solved))?;
    }
    if let Some(path) = &args.summary_out {
        write_table(path, |file| write_summary_csv(file, &solved))?;
    }

    let failed = outcomes.iter().filter(|o| o.is_err()).count();
    if failed > 0 {
        bail!("{failed} of {} stage(s) could not be solved", outcomes.len());
    }
    Ok(())
}

fn write_table<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(BufWriter<File>) -> ballast_lib::Result<()>,
{
    let file = File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write(BufWriter::new(file)).with_context(|| format!("failed to write {}", path.display()))
}
