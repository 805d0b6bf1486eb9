//! Run statistics and rate adjustment
//!
//! Every run ships a `stats.csv` of `key,value` records (population totals,
//! per-age-group populations, seeds, timings). [`prepare_stats`] turns that list
//! into a [`StatsMap`] which preprocessing functions read and which adjusts
//! series tables to rates per 100,000 people.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, ResultExt};
use crate::types::SeriesTable;

/// Stat key holding the simulated population size
pub const TOTAL_KEY: &str = "total";

/// Population base for rate adjustment
pub const RATE_BASE: f64 = 100_000.0;

/// A single `{key, value}` stat record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatRecord {
    pub key: String,
    pub value: String,
}

impl StatRecord {
    pub fn new(key: impl Into<String>, value: impl ToString) -> Self {
        Self {
            key: key.into(),
            value: value.to_string(),
        }
    }
}

/// Named adjustment strategies applied to a series table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjustment {
    /// Scale every value to a rate per 100,000 of the total population
    Per100k,
}

impl Adjustment {
    /// Look up a strategy by name; unknown names have no strategy
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "per100k" => Some(Adjustment::Per100k),
            _ => None,
        }
    }

    /// Strategy name as used in chart descriptors
    pub fn name(&self) -> &'static str {
        match self {
            Adjustment::Per100k => "per100k",
        }
    }
}

/// Stat lookup map with rate adjustment
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsMap {
    values: BTreeMap<String, f64>,
    raw: BTreeMap<String, String>,
}

/// Build a [`StatsMap`] from an ordered list of stat records
///
/// Keys are assumed unique; a repeated key keeps the last value.
pub fn prepare_stats<'a, I>(records: I) -> StatsMap
where
    I: IntoIterator<Item = &'a StatRecord>,
{
    let mut stats = StatsMap::default();
    for record in records {
        stats.insert(&record.key, &record.value);
    }
    stats
}

/// Read `key,value` records from a stats CSV file
pub fn read_stats_csv(path: impl AsRef<Path>) -> Result<Vec<StatRecord>> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open stats file {}", path.display()))?;

    let mut records = Vec::new();
    for record in reader.deserialize::<StatRecord>() {
        records.push(record.with_context(|| format!("Bad stat record in {}", path.display()))?);
    }
    Ok(records)
}

impl StatsMap {
    /// Insert a raw stat value
    pub fn insert(&mut self, key: &str, value: &str) {
        self.values
            .insert(key.to_string(), value.trim().parse().unwrap_or(f64::NAN));
        self.raw.insert(key.to_string(), value.to_string());
    }

    /// Numeric value of a stat
    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Raw string value of a stat
    pub fn raw(&self, key: &str) -> Option<&str> {
        self.raw.get(key).map(String::as_str)
    }

    /// Population total, if present
    pub fn total(&self) -> Option<f64> {
        self.get(TOTAL_KEY)
    }

    /// Number of stats
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Factor turning a count into a rate per 100,000
    ///
    /// NaN when the total is missing, infinite when it is zero.
    pub fn per_100k_factor(&self) -> f64 {
        RATE_BASE / self.total().unwrap_or(f64::NAN)
    }

    /// Convert a count into a rate per 100,000 people
    pub fn adjust_number_per_100k(&self, number: f64) -> f64 {
        number * self.per_100k_factor()
    }

    /// Apply a named adjustment; unknown names return the table unchanged
    pub fn adjust(&self, mut table: SeriesTable, kind: &str) -> SeriesTable {
        match Adjustment::from_name(kind) {
            Some(Adjustment::Per100k) => {
                let factor = self.per_100k_factor();
                for series in table.series_mut() {
                    for value in &mut series.values {
                        *value *= factor;
                    }
                }
                table
            }
            None => table,
        }
    }

    /// Stats as a JSON map (numbers where parseable) for the run index
    pub fn to_json_map(&self) -> BTreeMap<String, serde_json::Value> {
        self.raw
            .iter()
            .map(|(key, raw)| {
                let value = match raw.trim().parse::<f64>() {
                    Ok(n) => serde_json::Number::from_f64(n)
                        .map(serde_json::Value::Number)
                        .unwrap_or_else(|| serde_json::Value::String(raw.clone())),
                    Err(_) => serde_json::Value::String(raw.clone()),
                };
                (key.clone(), value)
            })
            .collect()
    }
}
