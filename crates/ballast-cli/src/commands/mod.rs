// Module exports for CLI subcommands
//
// Each module owns the arguments and handler for one subcommand. main.rs only
// parses the command line and dispatches here.

pub mod hydro;
pub mod solve;
pub mod tanks;
