//! CSV loading for the tank and hydrostatic tables.
//!
//! Header spellings vary between vessel data sources, so headers are
//! normalized and matched against a list of synonyms here, at the boundary.
//! Everything past this module works on strictly typed, validated records.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::hydro::{HydrostaticRow, HydrostaticTable};
use crate::tank::{Tank, TankMode, TankSet};

/// Priority weight assumed when the tank table has no priority column.
pub const DEFAULT_PRIORITY_WEIGHT: f64 = 1.0;

const TANK_SYNONYMS: &[(&str, &[&str])] = &[
    ("Tank", &["tank", "tank_id", "name", "id"]),
    ("Capacity_t", &["capacity_t", "capacity", "cap_t", "capacity_tons"]),
    ("x_from_mid_m", &["x_from_mid_m", "x_m", "lcg_m", "x", "x_mid_m"]),
    ("Current_t", &["current_t", "current", "cur_t", "current_tons"]),
    ("Min_t", &["min_t", "min", "min_tons"]),
    ("Max_t", &["max_t", "max", "max_tons"]),
    ("mode", &["mode", "tank_mode", "operating_mode"]),
    ("use_flag", &["use_flag", "use", "enabled", "in_use"]),
    ("pump_rate_tph", &["pump_rate_tph", "pump_rate", "rate_tph", "pump_tph"]),
    ("priority_weight", &["priority_weight", "priority", "weight"]),
];

const TANK_REQUIRED: &[&str] = &[
    "Tank",
    "Capacity_t",
    "x_from_mid_m",
    "Current_t",
    "Min_t",
    "Max_t",
    "pump_rate_tph",
];

const HYDRO_SYNONYMS: &[(&str, &[&str])] = &[
    ("Tmean_m", &["tmean_m", "tmean", "draft_m", "draft", "t_m"]),
    ("TPC_t_per_cm", &["tpc_t_per_cm", "tpc", "tpc_t_cm"]),
    ("MTC_t_m_per_cm", &["mtc_t_m_per_cm", "mtc", "mct", "mct1cm"]),
    ("LCF_m", &["lcf_m", "lcf", "lcf_from_mid_m"]),
    ("LBP_m", &["lbp_m", "lbp", "lpp_m", "lpp"]),
];

const HYDRO_REQUIRED: &[&str] = &["Tmean_m", "TPC_t_per_cm", "MTC_t_m_per_cm", "LCF_m", "LBP_m"];

/// Tanks loaded from a table, with the identifiers excluded by `use_flag`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedTanks {
    pub tanks: TankSet,
    pub excluded: Vec<String>,
}

/// Load the tank table from a CSV file.
pub fn load_tanks(path: &Path) -> Result<LoadedTanks> {
    let file = fs::File::open(path)?;
    let loaded = tanks_from_reader(file)?;
    info!(
        path = %path.display(),
        tanks = loaded.tanks.len(),
        excluded = loaded.excluded.len(),
        "loaded tank table"
    );
    Ok(loaded)
}

/// Load the tank table from any reader.
pub fn tanks_from_reader<R: Read>(reader: R) -> Result<LoadedTanks> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::Fields).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let columns = Columns::resolve("tank", &headers, TANK_SYNONYMS, TANK_REQUIRED)?;

    let mut tanks = Vec::new();
    let mut excluded = Vec::new();

    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let row = index + 2;
        let id = columns.get(&record, "Tank").unwrap_or_default().to_string();
        let label = if id.is_empty() {
            format!("<row {row}>")
        } else {
            id.clone()
        };
        let invalid = |message: String| Error::InvalidTank {
            tank: label.clone(),
            message,
        };

        let use_flag = match columns.get(&record, "use_flag") {
            Some(raw) => parse_flag(raw).map_err(invalid)?,
            None => true,
        };
        if !use_flag {
            debug!(tank = %label, "tank excluded by use_flag");
            excluded.push(id);
            continue;
        }

        let number = |field: &str| -> Result<f64> {
            let raw = columns
                .get(&record, field)
                .ok_or_else(|| invalid(format!("missing {field} at row {row}")))?;
            raw.parse::<f64>()
                .map_err(|e| invalid(format!("invalid {field} '{raw}' at row {row}: {e}")))
        };

        let mode = match columns.get(&record, "mode") {
            Some(raw) => raw.parse::<TankMode>().map_err(invalid)?,
            None => TankMode::default(),
        };
        let priority_weight = match columns.get(&record, "priority_weight") {
            Some(_) => number("priority_weight")?,
            None => DEFAULT_PRIORITY_WEIGHT,
        };

        tanks.push(Tank {
            id,
            capacity_t: number("Capacity_t")?,
            x_from_mid_m: number("x_from_mid_m")?,
            current_t: number("Current_t")?,
            min_t: number("Min_t")?,
            max_t: number("Max_t")?,
            mode,
            pump_rate_tph: number("pump_rate_tph")?,
            priority_weight,
        });
    }

    Ok(LoadedTanks {
        tanks: TankSet::new(tanks)?,
        excluded,
    })
}

/// Load the hydrostatic table from a CSV file.
pub fn load_hydrostatics(path: &Path) -> Result<HydrostaticTable> {
    let file = fs::File::open(path)?;
    let table = hydrostatics_from_reader(file)?;
    let (lo, hi) = table.draft_range();
    info!(
        path = %path.display(),
        rows = table.len(),
        min_draft_m = lo,
        max_draft_m = hi,
        "loaded hydrostatic table"
    );
    Ok(table)
}

/// Load the hydrostatic table from any reader.
pub fn hydrostatics_from_reader<R: Read>(reader: R) -> Result<HydrostaticTable> {
    let mut csv_reader = ReaderBuilder::new().trim(Trim::Fields).from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    let columns = Columns::resolve("hydrostatic", &headers, HYDRO_SYNONYMS, HYDRO_REQUIRED)?;

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        let row = index + 1;
        let number = |field: &str| -> Result<f64> {
            let raw = columns.get(&record, field).unwrap_or_default();
            raw.parse::<f64>()
                .map_err(|e| Error::InvalidHydrostatics {
                    row,
                    message: format!("invalid {field} '{raw}': {e}"),
                })
        };

        rows.push(HydrostaticRow {
            mean_draft_m: number("Tmean_m")?,
            tpc_t_per_cm: number("TPC_t_per_cm")?,
            mtc_t_m_per_cm: number("MTC_t_m_per_cm")?,
            lcf_m: number("LCF_m")?,
            lbp_m: number("LBP_m")?,
        });
    }

    HydrostaticTable::new(rows)
}

/// Canonical column name → record index.
struct Columns {
    index: BTreeMap<&'static str, usize>,
}

impl Columns {
    fn resolve(
        table: &'static str,
        headers: &StringRecord,
        synonyms: &[(&'static str, &[&str])],
        required: &[&str],
    ) -> Result<Self> {
        let normalized: Vec<String> = headers.iter().map(normalize_header).collect();

        let mut index = BTreeMap::new();
        for (canonical, alternatives) in synonyms {
            let found = alternatives.iter().find_map(|alt| {
                let alt = normalize_header(alt);
                normalized.iter().position(|h| *h == alt)
            });
            if let Some(i) = found {
                index.insert(*canonical, i);
            }
        }

        let missing: Vec<String> = required
            .iter()
            .filter(|name| !index.contains_key(*name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(Error::MissingColumns {
                table,
                missing,
                available: headers.iter().map(|h| h.to_string()).collect(),
            });
        }

        Ok(Self { index })
    }

    /// Trimmed cell value, `None` when the column is absent or the cell is blank.
    fn get<'r>(&self, record: &'r StringRecord, field: &str) -> Option<&'r str> {
        self.index
            .get(field)
            .and_then(|&i| record.get(i))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn normalize_header(s: &str) -> String {
    s.to_ascii_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect()
}

fn parse_flag(raw: &str) -> std::result::Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("invalid use_flag '{other}'")),
    }
}
