//! Dense two-phase primal simplex with bounded variables.
//!
//! Variables are shifted to `y = x - lower` so every column is non-negative;
//! finite upper bounds become explicit `y <= upper - lower` rows. Phase one
//! minimizes the sum of artificial variables, phase two the real objective.
//! Dantzig pricing is used until a run of degenerate pivots is seen, after
//! which Bland's rule takes over to rule out cycling.

use tracing::trace;

use super::{LpError, LpProblem, LpSolution, LpSolver, Relation};

const PIVOT_EPS: f64 = 1e-10;
const COST_EPS: f64 = 1e-9;
const FEASIBILITY_TOL: f64 = 1e-7;
const DEGENERATE_STREAK_LIMIT: usize = 50;

/// Bundled dense simplex backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimplexSolver {
    /// Pivot budget; `None` scales with problem size.
    pub max_pivots: Option<usize>,
}

impl SimplexSolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_pivots(max_pivots: usize) -> Self {
        Self {
            max_pivots: Some(max_pivots),
        }
    }
}

impl LpSolver for SimplexSolver {
    fn name(&self) -> &'static str {
        "dense-simplex"
    }

    fn solve(&self, problem: &LpProblem) -> Result<LpSolution, LpError> {
        problem.validate()?;

        for (bounds, label) in problem.bounds.iter().zip(&problem.labels) {
            if bounds.lower > bounds.upper + FEASIBILITY_TOL {
                return Err(LpError::Infeasible {
                    detail: format!(
                        "variable '{label}' has lower bound {} above upper bound {}",
                        bounds.lower, bounds.upper
                    ),
                });
            }
        }

        let mut tableau = Tableau::build(problem);
        let limit = self
            .max_pivots
            .unwrap_or_else(|| 1_000_usize.max(50 * (tableau.rows.len() + tableau.cols)));

        tableau.phase_one(limit)?;
        tableau.phase_two(&problem.objective, limit)?;

        let values = tableau.extract(problem);
        let objective: f64 = values
            .iter()
            .zip(&problem.objective)
            .map(|(x, c)| x * c)
            .sum();

        trace!(pivots = tableau.pivots, objective, "simplex finished");

        Ok(LpSolution {
            values,
            objective,
            pivots: tableau.pivots,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Column {
    Structural,
    Slack,
    Artificial,
}

struct Tableau {
    /// Constraint rows; the last entry of each row is the right-hand side.
    rows: Vec<Vec<f64>>,
    /// Reduced-cost row; its last entry is the negated objective value.
    z: Vec<f64>,
    basis: Vec<usize>,
    kinds: Vec<Column>,
    labels: Vec<String>,
    /// Constraint row each artificial column was created for.
    artificial_rows: Vec<usize>,
    structural: usize,
    cols: usize,
    pivots: usize,
}

impl Tableau {
    fn build(problem: &LpProblem) -> Self {
        let n = problem.num_vars();

        // (coefficients over y, relation, rhs, label)
        let mut raw: Vec<(Vec<f64>, Relation, f64, String)> = Vec::new();
        for constraint in &problem.constraints {
            let shift: f64 = constraint
                .coefficients
                .iter()
                .zip(&problem.bounds)
                .map(|(a, b)| a * b.lower)
                .sum();
            raw.push((
                constraint.coefficients.clone(),
                constraint.relation,
                constraint.rhs - shift,
                constraint.label.clone(),
            ));
        }
        for (j, (bounds, label)) in problem.bounds.iter().zip(&problem.labels).enumerate() {
            if bounds.upper.is_finite() {
                let mut coefficients = vec![0.0; n];
                coefficients[j] = 1.0;
                raw.push((
                    coefficients,
                    Relation::LessEqual,
                    (bounds.upper - bounds.lower).max(0.0),
                    format!("upper bound of {label}"),
                ));
            }
        }

        let slack_count = raw
            .iter()
            .filter(|(_, relation, _, _)| *relation == Relation::LessEqual)
            .count();
        let artificial_count = raw
            .iter()
            .filter(|(_, relation, rhs, _)| *relation == Relation::Equal || *rhs < 0.0)
            .count();
        let cols = n + slack_count + artificial_count;

        let mut kinds = vec![Column::Structural; n];
        kinds.extend(std::iter::repeat(Column::Slack).take(slack_count));
        kinds.extend(std::iter::repeat(Column::Artificial).take(artificial_count));

        let mut rows = Vec::with_capacity(raw.len());
        let mut basis = Vec::with_capacity(raw.len());
        let mut labels = Vec::with_capacity(raw.len());
        let mut next_slack = n;
        let mut next_artificial = n + slack_count;
        let mut artificial_rows = Vec::with_capacity(artificial_count);

        for (coefficients, relation, rhs, label) in raw {
            let mut row = vec![0.0; cols + 1];
            row[..n].copy_from_slice(&coefficients);
            row[cols] = rhs;

            let slack = if relation == Relation::LessEqual {
                row[next_slack] = 1.0;
                next_slack += 1;
                Some(next_slack - 1)
            } else {
                None
            };

            if rhs < 0.0 {
                for value in row.iter_mut() {
                    *value = -*value;
                }
            }

            match slack {
                Some(column) if rhs >= 0.0 => basis.push(column),
                _ => {
                    row[next_artificial] = 1.0;
                    basis.push(next_artificial);
                    artificial_rows.push(rows.len());
                    next_artificial += 1;
                }
            }

            rows.push(row);
            labels.push(label);
        }

        Self {
            rows,
            z: vec![0.0; cols + 1],
            basis,
            kinds,
            labels,
            artificial_rows,
            structural: n,
            cols,
            pivots: 0,
        }
    }

    fn rhs(&self, row: usize) -> f64 {
        self.rows[row][self.cols]
    }

    fn price(&mut self, costs: &[f64]) {
        let mut z = vec![0.0; self.cols + 1];
        z[..self.cols].copy_from_slice(costs);
        for (row, &basic) in self.rows.iter().zip(&self.basis) {
            let cb = costs[basic];
            if cb != 0.0 {
                for (zj, aj) in z.iter_mut().zip(row) {
                    *zj -= cb * aj;
                }
            }
        }
        self.z = z;
    }

    fn phase_one(&mut self, limit: usize) -> Result<(), LpError> {
        let costs: Vec<f64> = self
            .kinds
            .iter()
            .map(|kind| if *kind == Column::Artificial { 1.0 } else { 0.0 })
            .collect();
        if costs.iter().all(|c| *c == 0.0) {
            return Ok(());
        }

        self.price(&costs);
        self.iterate(true, limit)?;

        let infeasibility = -self.z[self.cols];
        if infeasibility > FEASIBILITY_TOL {
            let first_artificial = self.cols - self.artificial_rows.len();
            let worst = (0..self.rows.len())
                .filter(|&i| self.kinds[self.basis[i]] == Column::Artificial)
                .max_by(|&a, &b| self.rhs(a).total_cmp(&self.rhs(b)));
            let detail = match worst {
                Some(row) => format!(
                    "constraint '{}' cannot be satisfied (residual {:.6})",
                    self.labels[self.artificial_rows[self.basis[row] - first_artificial]],
                    self.rhs(row)
                ),
                None => format!("residual infeasibility {infeasibility:.6}"),
            };
            return Err(LpError::Infeasible { detail });
        }

        // Drive zero-valued artificials out of the basis where possible.
        for row in 0..self.rows.len() {
            if self.kinds[self.basis[row]] != Column::Artificial {
                continue;
            }
            let replacement = (0..self.cols).find(|&j| {
                self.kinds[j] != Column::Artificial && self.rows[row][j].abs() > PIVOT_EPS
            });
            if let Some(column) = replacement {
                self.pivot(row, column);
            }
        }

        Ok(())
    }

    fn phase_two(&mut self, objective: &[f64], limit: usize) -> Result<(), LpError> {
        let mut costs = vec![0.0; self.cols];
        costs[..self.structural].copy_from_slice(objective);
        self.price(&costs);
        self.iterate(false, limit)
    }

    fn iterate(&mut self, allow_artificial: bool, limit: usize) -> Result<(), LpError> {
        let mut degenerate_streak = 0;

        loop {
            let bland = degenerate_streak >= DEGENERATE_STREAK_LIMIT;
            let Some(entering) = self.entering(allow_artificial, bland) else {
                return Ok(());
            };
            let Some(leaving) = self.leaving(entering) else {
                return Err(LpError::Unbounded);
            };

            if self.pivots >= limit {
                return Err(LpError::IterationLimit { limit });
            }

            if self.rhs(leaving).abs() <= PIVOT_EPS {
                degenerate_streak += 1;
            } else {
                degenerate_streak = 0;
            }
            self.pivot(leaving, entering);
        }
    }

    fn entering(&self, allow_artificial: bool, bland: bool) -> Option<usize> {
        let candidates = (0..self.cols).filter(|&j| {
            (allow_artificial || self.kinds[j] != Column::Artificial) && self.z[j] < -COST_EPS
        });
        if bland {
            candidates.min()
        } else {
            candidates.min_by(|&a, &b| self.z[a].total_cmp(&self.z[b]))
        }
    }

    fn leaving(&self, entering: usize) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, row) in self.rows.iter().enumerate() {
            let a = row[entering];
            if a <= PIVOT_EPS {
                continue;
            }
            let ratio = row[self.cols].max(0.0) / a;
            best = match best {
                None => Some((i, ratio)),
                Some((bi, br)) => {
                    if ratio < br - 1e-12
                        || ((ratio - br).abs() <= 1e-12 && self.basis[i] < self.basis[bi])
                    {
                        Some((i, ratio))
                    } else {
                        Some((bi, br))
                    }
                }
            };
        }
        best.map(|(i, _)| i)
    }

    fn pivot(&mut self, row: usize, column: usize) {
        let factor = self.rows[row][column];
        for value in self.rows[row].iter_mut() {
            *value /= factor;
        }
        let pivot_row = self.rows[row].clone();

        for (i, other) in self.rows.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let scale = other[column];
            if scale != 0.0 {
                for (value, p) in other.iter_mut().zip(&pivot_row) {
                    *value -= scale * p;
                }
            }
        }

        let scale = self.z[column];
        if scale != 0.0 {
            for (value, p) in self.z.iter_mut().zip(&pivot_row) {
                *value -= scale * p;
            }
        }

        self.basis[row] = column;
        self.pivots += 1;
    }

    fn extract(&self, problem: &LpProblem) -> Vec<f64> {
        let mut shifted = vec![0.0; self.structural];
        for (row, &basic) in self.basis.iter().enumerate() {
            if basic < self.structural {
                shifted[basic] = self.rhs(row).max(0.0);
            }
        }
        shifted
            .into_iter()
            .zip(&problem.bounds)
            .map(|(y, bounds)| (bounds.lower + y).min(bounds.upper))
            .collect()
    }
}
