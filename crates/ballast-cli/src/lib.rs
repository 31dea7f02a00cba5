//! Ballast planning CLI library.
//!
//! Subcommand handlers, terminal styling and report rendering for the
//! `ballast-cli` binary.

pub mod commands;
pub mod output;
pub mod terminal;
