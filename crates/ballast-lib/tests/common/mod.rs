#![allow(dead_code)]

use std::path::PathBuf;

use ballast_lib::{
    load_hydrostatics, load_stages, load_tanks, HydrostaticRow, HydrostaticTable, LoadedTanks,
    StageConfig, Tank, TankMode,
};

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../docs/fixtures")
        .join(name)
}

pub fn fixture_tanks() -> LoadedTanks {
    load_tanks(&fixture_path("tanks.csv")).expect("tank fixture loads")
}

pub fn fixture_table() -> HydrostaticTable {
    load_hydrostatics(&fixture_path("hydrostatics.csv")).expect("hydrostatic fixture loads")
}

pub fn fixture_stages() -> Vec<StageConfig> {
    load_stages(&fixture_path("stages.json")).expect("stage fixture loads")
}

/// A 100 t tank with generous pumps and unit priority.
pub fn tank(id: &str, x: f64, current: f64, mode: TankMode) -> Tank {
    Tank {
        id: id.to_string(),
        capacity_t: 100.0,
        x_from_mid_m: x,
        current_t: current,
        min_t: 0.0,
        max_t: 100.0,
        mode,
        pump_rate_tph: 50.0,
        priority_weight: 1.0,
    }
}

pub fn row(draft: f64, tpc: f64, mtc: f64, lcf: f64) -> HydrostaticRow {
    HydrostaticRow {
        mean_draft_m: draft,
        tpc_t_per_cm: tpc,
        mtc_t_m_per_cm: mtc,
        lcf_m: lcf,
        lbp_m: 60.0,
    }
}

/// Single-row table; every lookup returns the same coefficients.
pub fn flat_table(tpc: f64, mtc: f64) -> HydrostaticTable {
    HydrostaticTable::new(vec![row(3.0, tpc, mtc, 0.0)]).expect("valid table")
}

pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}
