//! Linear programming problem definition and solver port.
//!
//! Problems are minimizations of the form:
//!
//! ```text
//! minimize    c^T x
//! subject to  A_ub x <= b_ub
//!             A_eq x == b_eq
//!             lower <= x <= upper
//! ```
//!
//! [`SimplexSolver`] is the bundled dense implementation. Other backends can be
//! plugged into the refinement loop through the [`LpSolver`] trait.

mod simplex;

pub use simplex::SimplexSolver;

use thiserror::Error;

/// Failure signal returned by an LP backend.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LpError {
    /// No point satisfies the constraints and bounds.
    #[error("problem is infeasible: {detail}")]
    Infeasible { detail: String },

    /// The objective decreases without bound.
    #[error("problem is unbounded")]
    Unbounded,

    /// The pivot budget ran out.
    #[error("pivot limit of {limit} reached")]
    IterationLimit { limit: usize },

    /// The problem definition itself is inconsistent.
    #[error("malformed problem: {message}")]
    Malformed { message: String },
}

/// Relation between the left- and right-hand side of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    LessEqual,
    Equal,
}

/// A single linear constraint row.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub coefficients: Vec<f64>,
    pub relation: Relation,
    pub rhs: f64,
    /// Human-readable name used in infeasibility diagnostics.
    pub label: String,
}

/// Lower and upper bounds on a decision variable.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableBounds {
    pub lower: f64,
    /// May be `f64::INFINITY`.
    pub upper: f64,
}

impl VariableBounds {
    pub fn new(lower: f64, upper: f64) -> Self {
        Self { lower, upper }
    }

    pub fn non_negative() -> Self {
        Self {
            lower: 0.0,
            upper: f64::INFINITY,
        }
    }
}

impl Default for VariableBounds {
    fn default() -> Self {
        Self::non_negative()
    }
}

/// Linear programming problem definition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LpProblem {
    /// Objective coefficients; the solver minimizes `c^T x`.
    pub objective: Vec<f64>,
    pub bounds: Vec<VariableBounds>,
    /// Variable names used in diagnostics.
    pub labels: Vec<String>,
    pub constraints: Vec<Constraint>,
}

impl LpProblem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a variable and return its index.
    pub fn add_variable(
        &mut self,
        cost: f64,
        bounds: VariableBounds,
        label: impl Into<String>,
    ) -> usize {
        self.objective.push(cost);
        self.bounds.push(bounds);
        self.labels.push(label.into());
        self.objective.len() - 1
    }

    /// Append a constraint; `coefficients` shorter than the variable count are zero-padded.
    pub fn add_constraint(
        &mut self,
        mut coefficients: Vec<f64>,
        relation: Relation,
        rhs: f64,
        label: impl Into<String>,
    ) {
        if coefficients.len() < self.num_vars() {
            coefficients.resize(self.num_vars(), 0.0);
        }
        self.constraints.push(Constraint {
            coefficients,
            relation,
            rhs,
            label: label.into(),
        });
    }

    pub fn num_vars(&self) -> usize {
        self.objective.len()
    }

    /// Check dimensions and finiteness.
    pub fn validate(&self) -> Result<(), LpError> {
        let n = self.num_vars();
        let malformed = |message: String| Err(LpError::Malformed { message });

        if self.bounds.len() != n || self.labels.len() != n {
            return malformed(format!(
                "expected {n} bounds and labels, got {} and {}",
                self.bounds.len(),
                self.labels.len()
            ));
        }
        if self.objective.iter().any(|c| !c.is_finite()) {
            return malformed("objective contains non-finite coefficients".to_string());
        }
        for (bounds, label) in self.bounds.iter().zip(&self.labels) {
            if !bounds.lower.is_finite() || bounds.upper.is_nan() {
                return malformed(format!("variable '{label}' needs a finite lower bound"));
            }
        }
        for constraint in &self.constraints {
            if constraint.coefficients.len() != n {
                return malformed(format!(
                    "constraint '{}' has {} coefficients for {n} variables",
                    constraint.label,
                    constraint.coefficients.len()
                ));
            }
            if !constraint.rhs.is_finite()
                || constraint.coefficients.iter().any(|c| !c.is_finite())
            {
                return malformed(format!(
                    "constraint '{}' contains non-finite values",
                    constraint.label
                ));
            }
        }
        Ok(())
    }
}

/// Optimal point returned by a solver.
#[derive(Debug, Clone, PartialEq)]
pub struct LpSolution {
    pub values: Vec<f64>,
    pub objective: f64,
    /// Pivots performed across both phases.
    pub pivots: usize,
}

/// Linear programming backend.
pub trait LpSolver: Send + Sync {
    /// Solver name for logging.
    fn name(&self) -> &'static str;

    /// Minimize `problem`, returning an optimal point or a failure signal.
    fn solve(&self, problem: &LpProblem) -> Result<LpSolution, LpError>;
}
