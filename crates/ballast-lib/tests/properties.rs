mod common;

use ballast_lib::gate::evaluate_gates;
use ballast_lib::{
    predict_drafts, GateConfig, GateKind, RefinementController, Solution, StageDrafts,
    StageProblem, TankMode, TankSet, UkcParams,
};

use common::{assert_close, fixture_stages, fixture_table, fixture_tanks};

fn solve_fixture_stages() -> (TankSet, Vec<Solution>) {
    let loaded = fixture_tanks();
    let table = fixture_table();
    let controller = RefinementController::default();

    let solutions = fixture_stages()
        .iter()
        .map(|config| {
            let stage = StageProblem::new(
                &loaded.tanks,
                &table,
                config.drafts().expect("drafts"),
                config.gates().expect("gates"),
            )
            .with_targets(config.targets());
            controller.solve(&stage).expect("fixture stage solves")
        })
        .collect();
    (loaded.tanks, solutions)
}

#[test]
fn mass_is_conserved_through_mean_draft_change() {
    let (_, solutions) = solve_fixture_stages();
    for solution in &solutions {
        let tpc = solution.hydrostatics.point.tpc_t_per_cm;
        let net: f64 = solution.transfers.iter().map(|t| t.delta_t).sum();
        assert_close(solution.prediction.delta_mean_m * tpc * 100.0, net, 1e-6);
        assert_close(solution.prediction.total_delta_t, net, 1e-9);
    }
}

#[test]
fn trim_is_aft_minus_forward() {
    let (_, solutions) = solve_fixture_stages();
    for solution in &solutions {
        let p = solution.prediction;
        assert_eq!(p.trim_m, p.aft_m - p.fwd_m);
        for iteration in &solution.iterations {
            let q = iteration.prediction;
            assert_eq!(q.trim_m, q.aft_m - q.fwd_m);
        }
    }
}

#[test]
fn transfers_respect_tank_bounds_and_modes() {
    let (tanks, solutions) = solve_fixture_stages();
    const TOL: f64 = 1e-7;

    for solution in &solutions {
        assert_eq!(solution.transfers.len(), tanks.len());
        for (tank, transfer) in tanks.tanks().iter().zip(&solution.transfers) {
            assert_eq!(tank.id, transfer.tank);
            let bounds = TankSet::bounds(tank);
            assert!(transfer.fill_t >= 0.0 && transfer.fill_t <= bounds.fill_upper + TOL);
            assert!(
                transfer.discharge_t >= 0.0 && transfer.discharge_t <= bounds.discharge_upper + TOL
            );
            assert!(transfer.final_t >= tank.min_t - TOL && transfer.final_t <= tank.max_t + TOL);

            match tank.mode {
                TankMode::Locked => assert_eq!(transfer.delta_t, 0.0, "{} is locked", tank.id),
                TankMode::FillOnly => assert_eq!(transfer.discharge_t, 0.0),
                TankMode::DischargeOnly => assert_eq!(transfer.fill_t, 0.0),
                TankMode::Bidirectional => {}
            }
        }
    }
}

#[test]
fn fixture_stages_meet_their_gates() {
    let (_, solutions) = solve_fixture_stages();

    let departure = &solutions[0];
    assert_eq!(departure.violation(GateKind::FwdMax), Some(0.0));
    assert_eq!(departure.violation(GateKind::AftMin), Some(0.0));
    assert_eq!(departure.violation(GateKind::Freeboard), Some(0.0));
    assert_eq!(departure.violation(GateKind::Ukc), None);
    assert!(departure.prediction.aft_m >= 3.30 - 1e-7);
    assert!(departure.prediction.fwd_m <= 2.70 + 1e-7);

    let channel = &solutions[1];
    assert!(!channel.has_violations());
    assert!(channel.plan_rows().is_empty(), "already within UKC, nothing to move");

    let partial = &solutions[2];
    assert_eq!(partial.violation(GateKind::Ukc), None);
    assert_eq!(partial.notices.len(), 1);
    assert_eq!(partial.notices[0].gate, GateKind::Ukc);
}

#[test]
fn more_tide_never_reduces_clearance() {
    let draft = 4.2;
    let mut previous = f64::NEG_INFINITY;
    for step in 0..20 {
        let params = UkcParams {
            depth_ref_m: Some(6.0),
            forecast_tide_m: Some(-1.0 + 0.15 * step as f64),
            squat_m: Some(0.3),
            safety_m: Some(0.2),
            ukc_min_m: Some(0.5),
            ..UkcParams::default()
        };
        let clearance = params.clearance(draft).expect("all parameters set");
        assert!(clearance >= previous);
        previous = clearance;
    }
}

#[test]
fn higher_freeboard_minimum_never_reduces_violation() {
    let tanks = fixture_tanks().tanks;
    let table = fixture_table();
    let point = table.interpolate(4.6).expect("in range").point;
    let zero = vec![0.0; tanks.len()];
    let prediction = predict_drafts(
        StageDrafts::new(4.5, 4.7).expect("drafts"),
        &tanks,
        &zero,
        &point,
    );

    let mut previous = 0.0;
    for step in 0..20 {
        let gates = GateConfig {
            vessel_depth_m: Some(5.5),
            freeboard_min_m: Some(0.1 * step as f64),
            ..GateConfig::default()
        };
        let reports = evaluate_gates(&gates.resolve().expect("valid"), &prediction);
        let magnitude = reports[0].status.magnitude_m();
        assert!(magnitude >= previous);
        previous = magnitude;
    }
    assert!(previous > 0.0, "largest FB_MIN must be violated at 4.7 m aft");
}

#[test]
fn clamped_lookups_return_boundary_coefficients() {
    let table = fixture_table();
    let rows = table.rows();
    let (first, last) = (rows[0], rows[rows.len() - 1]);

    for query in [1.99, 1.5, 0.0, -40.0] {
        let lookup = table.interpolate(query).expect("finite query");
        assert!(lookup.clamp.is_some());
        assert_eq!(lookup.point.tpc_t_per_cm, first.tpc_t_per_cm);
        assert_eq!(lookup.point.mtc_t_m_per_cm, first.mtc_t_m_per_cm);
        assert_eq!(lookup.point.lcf_m, first.lcf_m);
        assert_eq!(lookup.point.lbp_m, first.lbp_m);
    }

    for query in [5.01, 7.0, 1e6] {
        let lookup = table.interpolate(query).expect("finite query");
        assert!(lookup.clamp.is_some());
        assert_eq!(lookup.point.tpc_t_per_cm, last.tpc_t_per_cm);
        assert_eq!(lookup.point.mtc_t_m_per_cm, last.mtc_t_m_per_cm);
        assert_eq!(lookup.point.lcf_m, last.lcf_m);
    }
}
