//! Ballast transfer planning library.
//!
//! Given a ship's tank inventory, a hydrostatic table and a stage's draft
//! limits, this crate finds the least-cost set of tank fills and discharges
//! that keeps the predicted drafts inside every active safety gate. Draft
//! response is linearized around an interpolated hydrostatic point and the
//! point is refined over a small number of LP solves.
//!
//! Consumers such as the CLI should only depend on the items exported here.

#![deny(warnings)]

pub mod catalog;
pub mod coefficients;
pub mod error;
pub mod formulation;
pub mod gate;
pub mod hydro;
pub mod lp;
pub mod output;
pub mod predict;
pub mod refine;
pub mod solution;
pub mod stage;
pub mod tank;

pub use catalog::{load_hydrostatics, load_tanks, LoadedTanks};
pub use error::{Error, Result};
pub use formulation::{CostMode, TargetDrafts};
pub use gate::{GateConfig, GateKind, GateNotice, GateReport, GateStatus, UkcParams, UkcReference};
pub use hydro::{HydroClamp, HydrostaticPoint, HydrostaticRow, HydrostaticTable, Interpolation};
pub use lp::{LpSolver, SimplexSolver};
pub use predict::{predict_drafts, DraftPrediction, StageDrafts};
pub use refine::{IterationResult, RefinementController, RefinementOptions, StageProblem};
pub use solution::{Solution, StageSummary, TankTransfer, Termination, TransferAction};
pub use stage::{load_stages, StageConfig};
pub use tank::{Tank, TankBounds, TankMode, TankSet};
