//! Row reshaping helpers used by chart preprocessing functions
//!
//! Preprocessing is small-scale group-by / count-by / pivot work over the
//! rows of one CSV file. Grouped results keep a stable key order: keys that
//! look like non-negative integers (years, stages as numbers) come first in
//! ascending order, every other key follows in first-seen order. Series built
//! from counts therefore line up with the year axis no matter how the CSV is
//! sorted.

use std::collections::{BTreeMap, HashMap};

use crate::types::Series;

/// First year on the year axis
pub const FIRST_YEAR: i64 = 2000;

/// Number of years on the year axis
pub const YEAR_COUNT: usize = 5;

/// Number of five-year age groups
pub const AGE_GROUP_COUNT: usize = 18;

/// Cancer stages in display order
pub const STAGES: [&str; 4] = ["STAGE_1", "STAGE_2", "STAGE_3", "STAGE_4"];

/// Label of the five-year age group with the given index, e.g. `10-14`
pub fn age_group_label(index: usize) -> String {
    format!("{}-{}", 5 * index, 5 * index + 4)
}

/// Age group index of an age in years
pub fn age_group_index(age: f64) -> Option<usize> {
    if !age.is_finite() || age < 0.0 {
        return None;
    }
    let index = (age / 5.0).floor() as usize;
    (index < AGE_GROUP_COUNT).then_some(index)
}

// ==================== Row ====================

/// One CSV record, column name to raw value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: BTreeMap<String, String>,
}

impl Row {
    /// Build a row from `(column, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Raw value of a column
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells.get(column).map(String::as_str)
    }

    /// Numeric value of a column; NaN when missing or unparsable
    pub fn number(&self, column: &str) -> f64 {
        self.get(column)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(f64::NAN)
    }

    /// Whether a column holds exactly the given value
    pub fn is(&self, column: &str, value: &str) -> bool {
        self.get(column) == Some(value)
    }
}

// ==================== Grouping ====================

/// Ordered key/value list produced by the grouping helpers
pub type Grouped<T> = Vec<(String, T)>;

fn integer_key(key: &str) -> Option<u64> {
    if key.is_empty() || (key.len() > 1 && key.starts_with('0')) {
        return None;
    }
    key.parse().ok()
}

fn order_keys<T>(entries: Vec<(String, T)>) -> Grouped<T> {
    let (mut integers, others): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .partition(|(key, _)| integer_key(key).is_some());
    integers.sort_by_key(|(key, _)| integer_key(key));
    integers.extend(others);
    integers
}

fn cell_key(row: &Row, column: &str) -> String {
    row.get(column).unwrap_or("undefined").to_string()
}

/// Group rows by the value of a column
pub fn group_by<'a>(rows: &'a [Row], column: &str) -> Grouped<Vec<&'a Row>> {
    group_by_key(rows.iter(), |row| cell_key(row, column))
}

/// Group rows by a computed key
pub fn group_by_key<'a, I, F>(rows: I, mut key: F) -> Grouped<Vec<&'a Row>>
where
    I: IntoIterator<Item = &'a Row>,
    F: FnMut(&Row) -> String,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<&Row>)> = Vec::new();
    for row in rows {
        let k = key(row);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(row),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![row]));
            }
        }
    }
    order_keys(groups)
}

/// Count rows by the value of a column
pub fn count_by<'a, I>(rows: I, column: &str) -> Grouped<usize>
where
    I: IntoIterator<Item = &'a Row>,
{
    count_by_key(rows, |row| cell_key(row, column))
}

/// Count rows by a computed key
pub fn count_by_key<'a, I, F>(rows: I, key: F) -> Grouped<usize>
where
    I: IntoIterator<Item = &'a Row>,
    F: FnMut(&Row) -> String,
{
    group_by_key(rows, key)
        .into_iter()
        .map(|(k, rows)| (k, rows.len()))
        .collect()
}

/// Keep only the named groups, in the order the names are given
pub fn pick<T>(groups: Grouped<T>, keys: &[&str]) -> Grouped<T> {
    let mut by_key: HashMap<String, T> = groups.into_iter().collect();
    keys.iter()
        .filter_map(|k| by_key.remove(*k).map(|v| (k.to_string(), v)))
        .collect()
}

fn lookup(counts: &Grouped<usize>, key: &str) -> usize {
    counts
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, n)| *n)
        .unwrap_or(0)
}

/// Count values of a grouping, in key order, as floats
pub fn count_values(counts: &Grouped<usize>) -> Vec<f64> {
    counts.iter().map(|(_, n)| *n as f64).collect()
}

// ==================== Series Builders ====================

/// `[key, count(2000), ..., count(2004)]` counting rows by `Year`
pub fn flatten_by_year(rows: &[Row], key: &str) -> Series {
    let counts = count_by(rows, "Year");
    let values = (0..YEAR_COUNT as i64)
        .map(|offset| lookup(&counts, &(FIRST_YEAR + offset).to_string()) as f64)
        .collect();
    Series::new(key, values)
}

/// One `[stage, count]` series per cancer stage
pub fn flatten_by_stage(rows: &[Row]) -> Vec<Series> {
    let counts = count_by(rows, "Stage");
    STAGES
        .iter()
        .map(|stage| Series::new(*stage, vec![lookup(&counts, stage) as f64]))
        .collect()
}

/// One `[value, count]` series per distinct value of a column
pub fn count_and_flatten(rows: &[Row], column: &str) -> Vec<Series> {
    count_by(rows, column)
        .into_iter()
        .map(|(key, n)| Series::new(key, vec![n as f64]))
        .collect()
}

/// `[column, row[0][column], row[1][column], ...]`
pub fn flatten_by(rows: &[Row], column: &str) -> Series {
    Series::new(column, rows.iter().map(|r| r.number(column)).collect())
}

/// One series per group, counting each group's rows by `Year`
pub fn groups_by_year(groups: Grouped<Vec<&Row>>) -> Vec<Series> {
    groups
        .into_iter()
        .map(|(key, rows)| Series::new(key, count_values(&count_by(rows, "Year"))))
        .collect()
}

/// `[value, row.values_column...]` for the rows whose `filter_column` equals `value`
pub fn pluck_where(rows: &[Row], filter_column: &str, value: &str, values_column: &str) -> Series {
    Series::new(
        value,
        rows.iter()
            .filter(|r| r.is(filter_column, value))
            .map(|r| r.number(values_column))
            .collect(),
    )
}
