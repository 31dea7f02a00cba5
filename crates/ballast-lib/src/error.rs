use thiserror::Error;

use crate::refine::IterationResult;

/// Convenient result alias for the ballast planning library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// A tabular input is missing structurally required columns.
    #[error("{table} table missing required columns: {}. Available: {}", .missing.join(", "), .available.join(", "))]
    MissingColumns {
        table: &'static str,
        missing: Vec<String>,
        available: Vec<String>,
    },

    /// Raised when a tank record fails validation.
    #[error("invalid tank '{tank}': {message}")]
    InvalidTank { tank: String, message: String },

    /// Raised when duplicate tank identifiers are encountered.
    #[error("duplicate tank identifier encountered: {tank}")]
    DuplicateTank { tank: String },

    /// Raised when a stage has no usable tanks at all.
    #[error("tank set is empty; at least one usable tank is required")]
    EmptyTankSet,

    /// Raised when a hydrostatic row contains invalid values.
    #[error("invalid hydrostatic row {row}: {message}")]
    InvalidHydrostatics { row: usize, message: String },

    /// Raised when the hydrostatic table has no rows.
    #[error("hydrostatic table must contain at least one row")]
    EmptyHydrostatics,

    /// Raised when hydrostatic drafts are not strictly increasing.
    #[error("hydrostatic table is not sorted by draft: row {row} ({draft} m) does not exceed the previous row ({previous} m)")]
    NonMonotonicHydrostatics {
        row: usize,
        draft: f64,
        previous: f64,
    },

    /// Raised when the stage or gate configuration is invalid.
    #[error("invalid stage configuration: {message}")]
    InvalidStage { message: String },

    /// The LP has no feasible point, even with unbounded gate slack.
    #[error("solver reported infeasible problem at iteration {iteration}: {detail}")]
    SolverInfeasible {
        iteration: usize,
        detail: String,
        /// Last successfully solved iteration, if any.
        partial: Option<Box<IterationResult>>,
    },

    /// The LP objective is unbounded below.
    #[error("solver reported unbounded problem at iteration {iteration}")]
    SolverUnbounded { iteration: usize },

    /// The simplex pivot budget was exhausted before reaching optimality.
    #[error("solver exceeded {limit} pivots at iteration {iteration}")]
    SolverIterationLimit { iteration: usize, limit: usize },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Wrapper for CSV reader and writer errors.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// Wrapper for JSON (de)serialization errors.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error stems from malformed caller input rather than the solver.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Error::MissingColumns { .. }
                | Error::InvalidTank { .. }
                | Error::DuplicateTank { .. }
                | Error::EmptyTankSet
                | Error::InvalidHydrostatics { .. }
                | Error::EmptyHydrostatics
                | Error::NonMonotonicHydrostatics { .. }
                | Error::InvalidStage { .. }
                | Error::Csv(_)
                | Error::Json(_)
        )
    }

    /// Partial result attached to an infeasible solve, if one was produced.
    pub fn partial_result(&self) -> Option<&IterationResult> {
        match self {
            Error::SolverInfeasible { partial, .. } => partial.as_deref(),
            _ => None,
        }
    }
}

pub(crate) fn require_finite(value: f64, field: &str) -> std::result::Result<f64, String> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(format!("{field} must be a finite number, got {value}"))
    }
}
