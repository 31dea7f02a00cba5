//! Fixed-iteration hydrostatic refinement loop.
//!
//! Each iteration interpolates the hydrostatic point at the current mean-draft
//! estimate, rebuilds coefficients, gate rows and objective, solves the LP and
//! predicts the resulting drafts. The predicted mean draft becomes the next
//! estimate. The loop runs a fixed number of iterations unless an explicit
//! tolerance is configured.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::coefficients::Coefficients;
use crate::error::{Error, Result};
use crate::formulation::{
    CostMode, ObjectiveBuilder, StageFormulation, TargetDrafts, DEFAULT_SLACK_PENALTY,
};
use crate::gate::{evaluate_gates, ActiveGates, GateConfig, GateReport};
use crate::hydro::{HydrostaticTable, Interpolation};
use crate::lp::{LpError, LpSolver, SimplexSolver};
use crate::predict::{predict_drafts, DraftPrediction, StageDrafts};
use crate::solution::{Solution, Termination, TankTransfer};
use crate::tank::TankSet;

/// Iteration count used when none is configured.
pub const DEFAULT_ITERATIONS: usize = 2;

/// Values below this (tons) are treated as zero transfers.
const TRANSFER_EPSILON_T: f64 = 1e-9;

/// Options controlling one stage solve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RefinementOptions {
    /// Number of interpolate → solve → predict passes.
    pub iterations: usize,
    /// Opt-in early exit once the mean-draft estimate moves less than this (m).
    pub tolerance_m: Option<f64>,
    pub cost_mode: CostMode,
    pub slack_penalty: f64,
}

impl Default for RefinementOptions {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            tolerance_m: None,
            cost_mode: CostMode::default(),
            slack_penalty: DEFAULT_SLACK_PENALTY,
        }
    }
}

impl RefinementOptions {
    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::InvalidStage {
                message: "iteration count must be at least 1".to_string(),
            });
        }
        if let Some(tol) = self.tolerance_m {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(Error::InvalidStage {
                    message: format!("tolerance must be finite and positive, got {tol}"),
                });
            }
        }
        if !self.slack_penalty.is_finite() || self.slack_penalty <= 0.0 {
            return Err(Error::InvalidStage {
                message: format!(
                    "slack penalty must be finite and positive, got {}",
                    self.slack_penalty
                ),
            });
        }
        Ok(())
    }
}

/// Inputs for one stage solve. All fields are read-only for the duration of the solve.
#[derive(Debug, Clone, Copy)]
pub struct StageProblem<'a> {
    pub tanks: &'a TankSet,
    pub hydrostatics: &'a HydrostaticTable,
    pub drafts: StageDrafts,
    pub gates: GateConfig,
    pub targets: TargetDrafts,
}

impl<'a> StageProblem<'a> {
    pub fn new(
        tanks: &'a TankSet,
        hydrostatics: &'a HydrostaticTable,
        drafts: StageDrafts,
        gates: GateConfig,
    ) -> Self {
        Self {
            tanks,
            hydrostatics,
            drafts,
            gates,
            targets: TargetDrafts::default(),
        }
    }

    pub fn with_targets(mut self, targets: TargetDrafts) -> Self {
        self.targets = targets;
        self
    }
}

/// Outcome of a single refinement iteration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IterationResult {
    /// 1-based iteration number.
    pub iteration: usize,
    /// Mean draft the hydrostatics were evaluated at.
    pub estimated_mean_m: f64,
    pub hydrostatics: Interpolation,
    pub transfers: Vec<TankTransfer>,
    pub prediction: DraftPrediction,
    pub gates: Vec<GateReport>,
    /// LP objective, including slack penalties.
    pub objective: f64,
    pub pivots: usize,
}

impl IterationResult {
    /// Net mass change per tank in tank-set order.
    pub fn deltas_t(&self) -> Vec<f64> {
        self.transfers.iter().map(|t| t.delta_t).collect()
    }
}

/// Drives the refinement loop with a pluggable LP backend.
#[derive(Debug, Clone)]
pub struct RefinementController<S = SimplexSolver> {
    solver: S,
    options: RefinementOptions,
}

impl RefinementController<SimplexSolver> {
    /// Controller using the bundled simplex solver.
    pub fn new(options: RefinementOptions) -> Self {
        Self::with_solver(SimplexSolver::new(), options)
    }
}

impl Default for RefinementController<SimplexSolver> {
    fn default() -> Self {
        Self::new(RefinementOptions::default())
    }
}

impl<S: LpSolver> RefinementController<S> {
    pub fn with_solver(solver: S, options: RefinementOptions) -> Self {
        Self { solver, options }
    }

    pub fn options(&self) -> &RefinementOptions {
        &self.options
    }

    /// Solve one stage.
    ///
    /// Input errors and solver failures abort the stage. Gate violations and
    /// deactivated gates are reported inside the returned [`Solution`].
    pub fn solve(&self, stage: &StageProblem<'_>) -> Result<Solution> {
        self.options.validate()?;
        stage.drafts.validate()?;
        stage.targets.validate()?;
        let active = stage.gates.resolve()?;

        let objective = ObjectiveBuilder::new(self.options.cost_mode, self.options.slack_penalty);

        let mut estimate = stage.drafts.mean_m();
        let mut iterations: Vec<IterationResult> = Vec::with_capacity(self.options.iterations);
        let mut termination = Termination::Exhausted;

        for iteration in 1..=self.options.iterations {
            let result = self.iterate(stage, &active, &objective, estimate, iteration, &iterations)?;

            let shift = (result.prediction.mean_m - estimate).abs();
            debug!(
                iteration,
                estimated_mean_m = estimate,
                predicted_mean_m = result.prediction.mean_m,
                tpc = result.hydrostatics.point.tpc_t_per_cm,
                mtc = result.hydrostatics.point.mtc_t_m_per_cm,
                objective = result.objective,
                "refinement iteration solved"
            );

            estimate = result.prediction.mean_m;
            iterations.push(result);

            if let Some(tolerance) = self.options.tolerance_m {
                if shift <= tolerance {
                    termination = Termination::Converged;
                    break;
                }
            }
        }

        let Some(last) = iterations.last().cloned() else {
            return Err(Error::InvalidStage {
                message: "refinement produced no iterations".to_string(),
            });
        };

        for report in last.gates.iter().filter(|r| r.status.is_violated()) {
            warn!(
                gate = %report.gate,
                magnitude_m = report.status.magnitude_m(),
                "gate violated in final plan"
            );
        }

        info!(
            solver = self.solver.name(),
            iterations = iterations.len(),
            fwd_m = last.prediction.fwd_m,
            aft_m = last.prediction.aft_m,
            total_delta_t = last.prediction.total_delta_t,
            "stage solved"
        );

        Ok(Solution {
            initial: stage.drafts,
            transfers: last.transfers,
            prediction: last.prediction,
            gates: last.gates,
            notices: active.notices,
            hydrostatics: last.hydrostatics,
            objective: last.objective,
            cost_mode: self.options.cost_mode,
            termination,
            iterations,
        })
    }

    /// Solve independent stages on scoped worker threads, preserving input order.
    pub fn solve_stages(&self, stages: &[StageProblem<'_>]) -> Vec<Result<Solution>> {
        std::thread::scope(|scope| {
            let handles: Vec<_> = stages
                .iter()
                .map(|stage| scope.spawn(move || self.solve(stage)))
                .collect();
            handles
                .into_iter()
                .map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        Err(Error::InvalidStage {
                            message: "stage worker panicked".to_string(),
                        })
                    })
                })
                .collect()
        })
    }

    fn iterate(
        &self,
        stage: &StageProblem<'_>,
        active: &ActiveGates,
        objective: &ObjectiveBuilder,
        estimate: f64,
        iteration: usize,
        previous: &[IterationResult],
    ) -> Result<IterationResult> {
        let hydrostatics = stage.hydrostatics.interpolate(estimate)?;
        let coefficients = Coefficients::build(stage.tanks, &hydrostatics.point);
        let formulation = StageFormulation::build(
            stage.tanks,
            &coefficients,
            stage.drafts,
            active,
            &stage.targets,
            objective,
        );

        let lp = self
            .solver
            .solve(&formulation.problem)
            .map_err(|err| solver_error(err, iteration, previous.last()))?;

        let values = formulation.transfers(&lp.values);
        let layout = formulation.layout;
        let transfers: Vec<TankTransfer> = stage
            .tanks
            .tanks()
            .iter()
            .enumerate()
            .map(|(i, tank)| {
                TankTransfer::new(
                    tank,
                    clean(values[layout.fill(i)]),
                    clean(values[layout.discharge(i)]),
                )
            })
            .collect();

        let deltas: Vec<f64> = transfers.iter().map(|t| t.delta_t).collect();
        let prediction = predict_drafts(stage.drafts, stage.tanks, &deltas, &hydrostatics.point);
        let gates = evaluate_gates(active, &prediction);

        Ok(IterationResult {
            iteration,
            estimated_mean_m: estimate,
            hydrostatics,
            transfers,
            prediction,
            gates,
            objective: lp.objective,
            pivots: lp.pivots,
        })
    }
}

fn clean(value: f64) -> f64 {
    if value.abs() < TRANSFER_EPSILON_T {
        0.0
    } else {
        value
    }
}

fn solver_error(err: LpError, iteration: usize, last: Option<&IterationResult>) -> Error {
    match err {
        LpError::Infeasible { detail } => {
            warn!(iteration, %detail, "stage LP infeasible");
            Error::SolverInfeasible {
                iteration,
                detail,
                partial: last.cloned().map(Box::new),
            }
        }
        LpError::Unbounded => Error::SolverUnbounded { iteration },
        LpError::IterationLimit { limit } => Error::SolverIterationLimit { iteration, limit },
        LpError::Malformed { message } => Error::InvalidStage { message },
    }
}
