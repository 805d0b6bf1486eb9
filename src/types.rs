//! Core data types for epicharts
//!
//! This module contains the data structures exchanged between the run
//! compiler, the fetcher, the controller and the chart views.
//!
//! # Main Types
//!
//! - [`Series`] - One named numeric sequence, `[id, v1, v2, ...]` on the wire
//! - [`SeriesTable`] - Ordered collection of series handed to a chart view
//! - [`RunPayload`] - Chart id to series table, the body of `api/{type}/{id}.json`
//! - [`Run`] - A loadable dataset unit listed in `api/runs.json`
//!
//! # Series Ids
//!
//! Series from different runs share chart views, so the controller prefixes
//! every series id with `{run_id}_` before loading. [`prefixed_id`] and
//! [`SeriesTable::prefixed`] build those ids; unloading a run removes every id
//! starting with the same prefix.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Run type used by simulation session runs
pub const SESSION_RUN_TYPE: &str = "session";

/// Build the id a series gets once loaded under a run prefix
pub fn prefixed_id(prefix: &str, id: &str) -> String {
    format!("{}_{}", prefix, id)
}

/// Whether a loaded series id belongs to the given run prefix
pub fn has_prefix(id: &str, prefix: &str) -> bool {
    id.len() > prefix.len() && id.starts_with(prefix) && id.as_bytes()[prefix.len()] == b'_'
}

// ==================== Series ====================

/// One named numeric sequence
///
/// Serialized as a JSON array whose first element is the id and whose
/// remaining elements are the values. Missing values are NaN in memory and
/// `null` on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    /// Series id (legend label)
    pub id: String,
    /// Values in x order
    pub values: Vec<f64>,
}

impl Series {
    /// Create a new series
    pub fn new(id: impl Into<String>, values: Vec<f64>) -> Self {
        Self {
            id: id.into(),
            values,
        }
    }

    /// Copy of this series with its id moved under a run prefix
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self {
            id: prefixed_id(prefix, &self.id),
            values: self.values.clone(),
        }
    }

    /// Number of values in the series
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the series has no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Serialize for Series {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.values.len() + 1))?;
        seq.serialize_element(&self.id)?;
        for value in &self.values {
            if value.is_finite() {
                seq.serialize_element(value)?;
            } else {
                seq.serialize_element(&Option::<f64>::None)?;
            }
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for Series {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_seq(SeriesVisitor)
    }
}

struct SeriesVisitor;

impl<'de> Visitor<'de> for SeriesVisitor {
    type Value = Series;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an array of [label, value, ...]")
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Series, A::Error> {
        let label: serde_json::Value = seq
            .next_element()?
            .ok_or_else(|| de::Error::invalid_length(0, &self))?;
        let id = match label {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            serde_json::Value::Null => "null".to_string(),
            other => {
                return Err(de::Error::custom(format!(
                    "series label must be a scalar, got {}",
                    other
                )))
            }
        };

        let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(value) = seq.next_element::<serde_json::Value>()? {
            values.push(value_to_f64(&value));
        }
        Ok(Series { id, values })
    }
}

/// Numeric reading of a JSON cell: numbers and numeric strings, NaN otherwise
pub fn value_to_f64(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(f64::NAN),
        serde_json::Value::Bool(b) => {
            if *b {
                1.0
            } else {
                0.0
            }
        }
        _ => f64::NAN,
    }
}

// ==================== Series Table ====================

/// Ordered list of series, the interchange format between preprocessing,
/// chart views and unloading
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SeriesTable {
    series: Vec<Series>,
}

impl SeriesTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table from a list of series
    pub fn from_series(series: Vec<Series>) -> Self {
        Self { series }
    }

    /// Append a series
    pub fn push(&mut self, series: Series) {
        self.series.push(series);
    }

    /// Borrow the series in order
    pub fn series(&self) -> &[Series] {
        &self.series
    }

    /// Mutable access for in-place adjustment
    pub fn series_mut(&mut self) -> &mut [Series] {
        &mut self.series
    }

    /// Ids in order
    pub fn ids(&self) -> Vec<String> {
        self.series.iter().map(|s| s.id.clone()).collect()
    }

    /// Find a series by id
    pub fn get(&self, id: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.id == id)
    }

    /// Copy of the table with every series id prefixed
    pub fn prefixed(&self, prefix: &str) -> Self {
        Self {
            series: self.series.iter().map(|s| s.prefixed(prefix)).collect(),
        }
    }

    /// Number of series
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Whether the table holds no series
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

impl From<Vec<Series>> for SeriesTable {
    fn from(series: Vec<Series>) -> Self {
        Self::from_series(series)
    }
}

impl IntoIterator for SeriesTable {
    type Item = Series;
    type IntoIter = std::vec::IntoIter<Series>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.into_iter()
    }
}

/// Body of a run endpoint: chart id to series table
pub type RunPayload = BTreeMap<String, SeriesTable>;

// ==================== Run ====================

/// A loadable dataset unit listed in the run index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Run {
    /// Run id, also the series id prefix
    pub id: String,
    /// Display label
    #[serde(default)]
    pub label: Option<String>,
    /// Run type, the first path segment of the run endpoint
    #[serde(rename = "type", default = "default_run_type")]
    pub kind: String,
    /// CSS-style color used for the toggle stripe
    #[serde(default)]
    pub color: Option<String>,
    /// Whether the run's data is loaded
    #[serde(default)]
    pub loaded: bool,
    /// Summary statistics shown when the run is loaded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<BTreeMap<String, serde_json::Value>>,
    /// When the run payload was compiled
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_run_type() -> String {
    SESSION_RUN_TYPE.to_string()
}

impl Run {
    /// Create a session run with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: None,
            kind: default_run_type(),
            color: None,
            loaded: false,
            stats: None,
            created_at: None,
        }
    }

    /// Set the run type
    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    /// Set the label
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the color
    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Endpoint path of this run's payload, relative to the data root
    pub fn data_path(&self) -> String {
        format!("api/{}/{}.json", self.kind, self.id)
    }

    /// Label to display, falling back to `*` like an unnamed save slot
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or("*")
    }

    /// Whether this is a simulation session run
    pub fn is_session(&self) -> bool {
        self.kind == SESSION_RUN_TYPE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_series_roundtrip_with_null() {
        let series: Series = serde_json::from_str(r#"["s1", 1, null, "2.5"]"#).unwrap();
        assert_eq!(series.id, "s1");
        assert_eq!(series.values[0], 1.0);
        assert!(series.values[1].is_nan());
        assert_eq!(series.values[2], 2.5);

        let json = serde_json::to_string(&series).unwrap();
        assert_eq!(json, r#"["s1",1.0,null,2.5]"#);
    }

    #[test]
    fn test_numeric_label_becomes_string() {
        let table: SeriesTable = serde_json::from_str(r#"[[2001, 4, 5]]"#).unwrap();
        assert_eq!(table.ids(), vec!["2001".to_string()]);
    }

    #[test]
    fn test_empty_series_rejected() {
        assert!(serde_json::from_str::<Series>("[]").is_err());
    }

    #[test]
    fn test_prefixing() {
        let table = SeriesTable::from_series(vec![
            Series::new("MALE", vec![1.0]),
            Series::new("FEMALE", vec![2.0]),
        ]);
        let prefixed = table.prefixed("run1");
        assert_eq!(prefixed.ids(), vec!["run1_MALE", "run1_FEMALE"]);
        assert_eq!(prefixed.get("run1_FEMALE").unwrap().values, vec![2.0]);
    }

    #[test]
    fn test_has_prefix() {
        assert!(has_prefix("run1_s1", "run1"));
        assert!(!has_prefix("run10_s1", "run1"));
        assert!(!has_prefix("run1", "run1"));
        assert!(!has_prefix("xrun1_s1", "run1"));
    }

    #[test]
    fn test_run_defaults() {
        let run: Run = serde_json::from_str(r#"{"id": "a1"}"#).unwrap();
        assert_eq!(run.kind, "session");
        assert!(!run.loaded);
        assert_eq!(run.data_path(), "api/session/a1.json");
        assert_eq!(run.display_label(), "*");
    }
}
