use std::path::PathBuf;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use predicates::str::contains;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../docs/fixtures")
        .join(name)
        .canonicalize()
        .expect("fixture present")
}

fn cli() -> Command {
    let mut cmd = cargo_bin_cmd!("ballast-cli");
    cmd.env("RUST_LOG", "error").env("NO_COLOR", "1");
    cmd
}

#[test]
fn lists_tanks_with_bounds() {
    cli()
        .arg("tanks")
        .arg("--tanks")
        .arg(fixture("tanks.csv"))
        .assert()
        .success()
        .stdout(contains("Usable tanks (9):"))
        .stdout(contains("fill-only"))
        .stdout(contains("locked"))
        .stdout(contains("Excluded by use_flag: VOID1"));
}

#[test]
fn tanks_json_includes_bounds() {
    let output = cli()
        .args(["tanks", "--format", "json", "--tanks"])
        .arg(fixture("tanks.csv"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let tanks: serde_json::Value = serde_json::from_slice(&output).expect("valid json");
    let apt = tanks
        .as_array()
        .and_then(|all| all.iter().find(|t| t["id"] == "APT"))
        .expect("APT listed");
    assert_eq!(apt["bounds"]["fill_upper"], 20.0);
    assert_eq!(apt["bounds"]["discharge_upper"], 50.0);
}

#[test]
fn hydro_lookup_interpolates() {
    cli()
        .args(["hydro", "--draft", "2.25", "--hydro"])
        .arg(fixture("hydrostatics.csv"))
        .assert()
        .success()
        .stdout(contains("Hydrostatics at 2.250 m"))
        .stdout(contains("TPC 9.100 t/cm"));
}

#[test]
fn hydro_lookup_reports_clamping() {
    let output = cli()
        .args(["hydro", "--draft", "6.5", "--format", "json", "--hydro"])
        .arg(fixture("hydrostatics.csv"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let lookup: serde_json::Value = serde_json::from_slice(&output).expect("valid json");
    assert_eq!(lookup["clamp"]["side"], "above");
    assert_eq!(lookup["clamp"]["boundary_draft_m"], 5.0);
    assert_eq!(lookup["point"]["tpc_t_per_cm"], 10.5);
}

#[test]
fn tanks_csv_lists_bounds_per_tank() {
    cli()
        .args(["tanks", "--format", "csv", "--tanks"])
        .arg(fixture("tanks.csv"))
        .assert()
        .success()
        .stdout(contains(
            "Tank,Mode,Capacity_t,x_from_mid_m,Current_t,Min_t,Max_t,pump_rate_tph,priority_weight,Fill_max_t,Discharge_max_t\n",
        ))
        .stdout(contains("APT,bidirectional,80,26,60,10,80,60,2,20,50\n"))
        .stdout(contains("Usable tanks").not());
}

#[test]
fn hydro_csv_reports_clamp_boundary() {
    cli()
        .args(["hydro", "--draft", "6.5", "--format", "csv", "--hydro"])
        .arg(fixture("hydrostatics.csv"))
        .assert()
        .success()
        .stdout(contains("Tmean_m,TPC_t_per_cm,MTC_t_m_per_cm,LCF_m,LBP_m,Clamped_to_m\n"))
        .stdout(contains("6.5,10.5,55,-1.8,60,5\n"));
}
