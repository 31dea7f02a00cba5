use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use ballast_cli::commands::hydro::{handle_hydro, HydroArgs};
use ballast_cli::commands::solve::{handle_solve, SolveArgs};
use ballast_cli::commands::tanks::{handle_list_tanks, TanksArgs};
use ballast_cli::terminal::ColorPalette;

#[derive(Parser, Debug)]
#[command(author, version, about = "Ballast transfer planning utilities")]
struct Cli {
    /// Disable ANSI colors in text output.
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Plan ballast transfers for each stage in a stage configuration.
    Solve(SolveArgs),
    /// List usable tanks with their fill and discharge bounds.
    Tanks(TanksArgs),
    /// Interpolate the hydrostatic table at a mean draft.
    Hydro(HydroArgs),
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let palette = if cli.no_color {
        ColorPalette::plain()
    } else {
        ColorPalette::detect()
    };

    match &cli.command {
        Command::Solve(args) => handle_solve(args, &palette),
        Command::Tanks(args) => handle_list_tanks(args),
        Command::Hydro(args) => handle_hydro(args, &palette),
    }
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}
