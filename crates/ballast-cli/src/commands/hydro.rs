//! Hydro command handler: look up hydrostatic coefficients at a mean draft.

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use ballast_lib::load_hydrostatics;

use crate::output::{render_hydrostatics, OutputFormat};
use crate::terminal::ColorPalette;

#[derive(Args, Debug, Clone)]
pub struct HydroArgs {
    /// Hydrostatic table (CSV).
    #[arg(long = "hydro", env = "BALLAST_HYDRO")]
    pub hydro: PathBuf,

    /// Mean draft to evaluate (m).
    #[arg(long)]
    pub draft: f64,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Handle the hydro subcommand.
pub fn handle_hydro(args: &HydroArgs, palette: &ColorPalette) -> Result<()> {
    let table = load_hydrostatics(&args.hydro).with_context(|| {
        format!(
            "failed to load hydrostatic table from {}",
            args.hydro.display()
        )
    })?;
    let interpolation = table
        .interpolate(args.draft)
        .with_context(|| format!("failed to interpolate at {} m", args.draft))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Json => ballast_lib::output::write_json(&mut out, &interpolation)?,
        OutputFormat::Csv => {
            ballast_lib::output::write_interpolation_csv(&mut out, &interpolation)?
        }
        OutputFormat::Text => {
            let heading = format!("Hydrostatics at {:.3} m", args.draft);
            render_hydrostatics(&mut out, &heading, &interpolation, palette)?;
        }
    }
    Ok(())
}
