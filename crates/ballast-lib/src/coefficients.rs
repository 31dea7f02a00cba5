//! Linear coefficients relating tank transfers to draft changes.
//!
//! Decision variables are laid out as `[fill_0 .. fill_{n-1}, discharge_0 ..
//! discharge_{n-1}]`; every coefficient vector produced here has length `2n`
//! in that order.

use crate::hydro::HydrostaticPoint;
use crate::tank::TankSet;

/// Index mapping between tanks and their fill/discharge decision variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLayout {
    tanks: usize,
}

impl VariableLayout {
    pub fn new(tanks: usize) -> Self {
        Self { tanks }
    }

    pub fn fill(&self, tank: usize) -> usize {
        tank
    }

    pub fn discharge(&self, tank: usize) -> usize {
        self.tanks + tank
    }

    /// Number of transfer variables (fill + discharge).
    pub fn transfer_len(&self) -> usize {
        2 * self.tanks
    }
}

/// Coefficient vectors over the `2n` transfer variables.
#[derive(Debug, Clone, PartialEq)]
pub struct Coefficients {
    /// +1 for fill, −1 for discharge.
    pub mass: Vec<f64>,
    /// +arm for fill, −arm for discharge, where arm = x − LCF.
    pub moment: Vec<f64>,
    /// Change in mean draft per ton (m/t).
    pub tmean: Vec<f64>,
    /// Change in trim per ton (m/t).
    pub trim: Vec<f64>,
    /// Change in forward draft per ton.
    pub dfwd: Vec<f64>,
    /// Change in aft draft per ton.
    pub daft: Vec<f64>,
}

impl Coefficients {
    /// Build all coefficient vectors for `tanks` at `point`.
    ///
    /// Callers guarantee TPC and MTC are positive; the hydrostatic table
    /// rejects other rows at load time.
    pub fn build(tanks: &TankSet, point: &HydrostaticPoint) -> Self {
        let layout = VariableLayout::new(tanks.len());
        let n = layout.transfer_len();

        let mut mass = vec![0.0; n];
        let mut moment = vec![0.0; n];
        for (i, arm) in moment_arms(tanks, point).into_iter().enumerate() {
            mass[layout.fill(i)] = 1.0;
            mass[layout.discharge(i)] = -1.0;
            moment[layout.fill(i)] = arm;
            moment[layout.discharge(i)] = -arm;
        }

        let tpc_scale = point.tpc_t_per_cm * 100.0;
        let mtc_scale = point.mtc_t_m_per_cm * 100.0;

        let tmean: Vec<f64> = mass.iter().map(|m| m / tpc_scale).collect();
        let trim: Vec<f64> = moment.iter().map(|m| m / mtc_scale).collect();
        let dfwd = tmean
            .iter()
            .zip(&trim)
            .map(|(mean, trim)| mean - 0.5 * trim)
            .collect();
        let daft = tmean
            .iter()
            .zip(&trim)
            .map(|(mean, trim)| mean + 0.5 * trim)
            .collect();

        Self {
            mass,
            moment,
            tmean,
            trim,
            dfwd,
            daft,
        }
    }
}

/// Lever arm of each tank about the centre of flotation.
pub fn moment_arms(tanks: &TankSet, point: &HydrostaticPoint) -> Vec<f64> {
    tanks
        .tanks()
        .iter()
        .map(|tank| tank.x_from_mid_m - point.lcf_m)
        .collect()
}

pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tank::fixtures::tank;
    use crate::tank::TankMode;

    fn point(lcf: f64) -> HydrostaticPoint {
        HydrostaticPoint {
            mean_draft_m: 4.0,
            tpc_t_per_cm: 8.0,
            mtc_t_m_per_cm: 34.0,
            lcf_m: lcf,
            lbp_m: 60.0,
        }
    }

    #[test]
    fn layout_places_discharge_after_fill() {
        let layout = VariableLayout::new(3);
        assert_eq!(layout.fill(2), 2);
        assert_eq!(layout.discharge(0), 3);
        assert_eq!(layout.transfer_len(), 6);
    }

    #[test]
    fn arms_are_measured_from_lcf() {
        let tanks = TankSet::new(vec![
            tank("FPT", -25.0, 0.0, TankMode::Bidirectional),
            tank("APT", 25.0, 0.0, TankMode::Bidirectional),
        ])
        .expect("valid");
        assert_eq!(moment_arms(&tanks, &point(-1.0)), vec![-24.0, 26.0]);
    }

    #[test]
    fn vectors_follow_sign_conventions() {
        let tanks =
            TankSet::new(vec![tank("APT", 5.0, 0.0, TankMode::Bidirectional)]).expect("valid");
        let c = Coefficients::build(&tanks, &point(0.0));

        assert_eq!(c.mass, vec![1.0, -1.0]);
        assert_eq!(c.moment, vec![5.0, -5.0]);
        assert!((c.tmean[0] - 1.0 / 800.0).abs() < 1e-15);
        assert!((c.trim[0] - 5.0 / 3400.0).abs() < 1e-15);
        // Filling an aft tank sinks the stern more than the bow.
        assert!(c.daft[0] > c.dfwd[0]);
        assert!((c.daft[1] + c.daft[0]).abs() < 1e-15);
        assert!((c.daft[0] - c.dfwd[0] - c.trim[0]).abs() < 1e-15);
    }

    #[test]
    fn dot_product_matches_manual_sum() {
        assert_eq!(dot(&[1.0, 2.0, 3.0], &[4.0, -1.0, 0.5]), 3.5);
    }
}
