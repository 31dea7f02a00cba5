//! Tanks command handler: list usable tanks and their transfer bounds.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use ballast_lib::{load_tanks, LoadedTanks, Tank, TankBounds, TankSet};

use crate::output::OutputFormat;
use crate::terminal::format_tons;

#[derive(Args, Debug, Clone)]
pub struct TanksArgs {
    /// Tank table (CSV).
    #[arg(long = "tanks", env = "BALLAST_TANKS")]
    pub tanks: PathBuf,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct TankEntry<'a> {
    #[serde(flatten)]
    tank: &'a Tank,
    bounds: TankBounds,
}

/// Handle the tanks subcommand.
pub fn handle_list_tanks(args: &TanksArgs) -> Result<()> {
    let loaded = load_tanks(&args.tanks)
        .with_context(|| format!("failed to load tank table from {}", args.tanks.display()))?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match args.format {
        OutputFormat::Json => {
            let entries: Vec<TankEntry<'_>> = loaded
                .tanks
                .tanks()
                .iter()
                .map(|tank| TankEntry {
                    tank,
                    bounds: TankSet::bounds(tank),
                })
                .collect();
            ballast_lib::output::write_json(&mut out, &entries)?;
        }
        OutputFormat::Csv => ballast_lib::output::write_tanks_csv(&mut out, &loaded.tanks)?,
        OutputFormat::Text => print_tank_table(&mut out, &loaded)?,
    }
    Ok(())
}

fn print_tank_table<W: Write>(out: &mut W, loaded: &LoadedTanks) -> io::Result<()> {
    let tanks = loaded.tanks.tanks();
    writeln!(out, "Usable tanks ({}):", tanks.len())?;
    writeln!(
        out,
        "{:<12} {:<15} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>8}",
        "Tank", "Mode", "x (m)", "Current", "Min", "Max", "Fill <=", "Disch <=", "t/h"
    )?;
    for tank in tanks {
        let bounds = TankSet::bounds(tank);
        writeln!(
            out,
            "{:<12} {:<15} {:>8.2} {:>10} {:>10} {:>10} {:>10} {:>10} {:>8.0}",
            tank.id,
            tank.mode,
            tank.x_from_mid_m,
            format_tons(tank.current_t),
            format_tons(tank.min_t),
            format_tons(tank.max_t),
            format_tons(bounds.fill_upper),
            format_tons(bounds.discharge_upper),
            tank.pump_rate_tph,
        )?;
    }
    writeln!(out, "Total ballast: {} t", format_tons(loaded.tanks.total_current_t()))?;
    if !loaded.excluded.is_empty() {
        writeln!(out, "Excluded by use_flag: {}", loaded.excluded.join(", "))?;
    }
    Ok(())
}
