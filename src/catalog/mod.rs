//! Chart catalog
//!
//! The catalog is the static list of charts the viewer knows about. Each
//! [`ChartDescriptor`] names the CSV source a chart is computed from, the
//! preprocessing function that turns rows into a [`SeriesTable`], an optional
//! adjustment strategy and the visual configuration of its views.
//!
//! Catalogs are assembled with [`CatalogBuilder`] from [`ChartDraft`]s and
//! validated once in [`CatalogBuilder::build`]: ids must be unique and every
//! draft must carry a label, a source and a preprocessing function. Drafts that
//! declare `disabled(true)` are validated but left out of the renderable set;
//! this static filter is separate from the runtime toggle users flip in the UI.
//!
//! # Example
//!
//! ```ignore
//! use epicharts::catalog::{CatalogBuilder, ChartDraft, ChartType};
//!
//! let catalog = CatalogBuilder::new()
//!     .add(
//!         ChartDraft::new("mortality")
//!             .label("Mortality")
//!             .source("mortality.csv")
//!             .preprocess(|rows, _| preprocess::flatten_by_year(rows, "Total").into())
//!             .chart_type(ChartType::Area),
//!     )
//!     .build()?;
//! ```

pub mod builtin;
pub mod preprocess;

pub use builtin::builtin_catalog;
pub use preprocess::Row;

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::StatsMap;
use crate::types::SeriesTable;

/// Preprocessing function: CSV rows and run stats to a series table
pub type PreprocessFn = fn(&[Row], &StatsMap) -> SeriesTable;

/// Catalog validation errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CatalogError {
    #[error("chart id must not be empty")]
    EmptyId,

    #[error("duplicate chart id '{0}'")]
    DuplicateId(String),

    #[error("chart '{id}' is missing required field '{field}'")]
    MissingField { id: String, field: &'static str },
}

// ==================== Visual Config ====================

/// How a chart's series are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
    #[default]
    Line,
    Area,
    Bar,
}

/// Tick label format for an axis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum TickFormat {
    /// Plain numeric value
    #[default]
    Value,
    /// Index 0 is the year 2000
    IndexToYear,
    /// Index i is the five-year age group starting at 5 * i
    AgeGroup,
    /// Index into a list of category names
    Categories(Vec<String>),
    /// No tick labels
    Hidden,
}

impl TickFormat {
    /// Format a tick value
    pub fn format(&self, value: f64) -> String {
        match self {
            TickFormat::Value => format!("{}", value),
            TickFormat::IndexToYear => format!("{}", 2000 + value.round() as i64),
            TickFormat::AgeGroup => index_label(value)
                .map(preprocess::age_group_label)
                .unwrap_or_default(),
            TickFormat::Categories(names) => index_label(value)
                .and_then(|i| names.get(i).cloned())
                .unwrap_or_default(),
            TickFormat::Hidden => String::new(),
        }
    }
}

fn index_label(value: f64) -> Option<usize> {
    let rounded = value.round();
    if (value - rounded).abs() > 1e-6 || rounded < 0.0 {
        return None;
    }
    Some(rounded as usize)
}

/// Axis configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Axis title
    pub label: Option<String>,
    /// Tick label format
    pub tick_format: TickFormat,
    /// Lower bound of the visible range
    pub min: Option<f64>,
}

/// Visual configuration handed to the view factory
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VisualConfig {
    pub chart_type: ChartType,
    /// Series ids stacked together (bar charts)
    pub groups: Vec<Vec<String>>,
    pub x_axis: AxisConfig,
    pub y_axis: AxisConfig,
    /// Point radius override for the full view
    pub point_radius: Option<f32>,
}

// ==================== Descriptor ====================

/// Immutable catalog entry describing one chart
#[derive(Debug, Clone)]
pub struct ChartDescriptor {
    pub id: String,
    pub label: String,
    /// CSV file the chart is computed from
    pub source: String,
    pub group: Option<String>,
    pub preprocess: PreprocessFn,
    /// Adjustment strategy name applied after preprocessing
    pub adjust: Option<String>,
    pub visual: VisualConfig,
    /// Declared disabled flag; `None` when the catalog leaves it to the user
    pub disabled: Option<bool>,
}

impl ChartDescriptor {
    /// Run the preprocessing function and the adjustment strategy
    pub fn compute(&self, rows: &[Row], stats: &StatsMap) -> SeriesTable {
        let table = (self.preprocess)(rows, stats);
        match &self.adjust {
            Some(kind) => stats.adjust(table, kind),
            None => table,
        }
    }
}

/// Unvalidated chart definition collected by [`CatalogBuilder`]
#[derive(Debug, Clone, Default)]
pub struct ChartDraft {
    id: String,
    label: Option<String>,
    source: Option<String>,
    group: Option<String>,
    preprocess: Option<PreprocessFn>,
    adjust: Option<String>,
    visual: VisualConfig,
    disabled: Option<bool>,
}

impl ChartDraft {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn preprocess(mut self, preprocess: PreprocessFn) -> Self {
        self.preprocess = Some(preprocess);
        self
    }

    pub fn adjust(mut self, kind: impl Into<String>) -> Self {
        self.adjust = Some(kind.into());
        self
    }

    pub fn visual(mut self, visual: VisualConfig) -> Self {
        self.visual = visual;
        self
    }

    pub fn chart_type(mut self, chart_type: ChartType) -> Self {
        self.visual.chart_type = chart_type;
        self
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }

    fn into_descriptor(self) -> Result<ChartDescriptor, CatalogError> {
        if self.id.trim().is_empty() {
            return Err(CatalogError::EmptyId);
        }
        let missing = |field| CatalogError::MissingField {
            id: self.id.clone(),
            field,
        };
        let label = self
            .label
            .clone()
            .filter(|l| !l.is_empty())
            .ok_or_else(|| missing("label"))?;
        let source = self
            .source
            .clone()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| missing("source"))?;
        let preprocess = self.preprocess.ok_or_else(|| missing("preprocess"))?;

        Ok(ChartDescriptor {
            id: self.id,
            label,
            source,
            group: self.group,
            preprocess,
            adjust: self.adjust,
            visual: self.visual,
            disabled: self.disabled,
        })
    }
}

// ==================== Catalog ====================

/// Collects chart drafts and validates them into a [`Catalog`]
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    drafts: Vec<ChartDraft>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chart draft
    #[allow(clippy::should_implement_trait)]
    pub fn add(mut self, draft: ChartDraft) -> Self {
        self.drafts.push(draft);
        self
    }

    /// Validate every draft and build the immutable catalog
    pub fn build(self) -> Result<Catalog, CatalogError> {
        let mut seen = HashSet::new();
        let mut charts = Vec::new();
        let mut declared_disabled = Vec::new();

        for draft in self.drafts {
            let descriptor = draft.into_descriptor()?;
            if !seen.insert(descriptor.id.clone()) {
                return Err(CatalogError::DuplicateId(descriptor.id));
            }
            if descriptor.disabled == Some(true) {
                tracing::debug!("Chart '{}' is disabled in the catalog", descriptor.id);
                declared_disabled.push(descriptor.id);
                continue;
            }
            charts.push(Arc::new(descriptor));
        }

        Ok(Catalog {
            charts,
            declared_disabled,
        })
    }
}

/// Validated, immutable list of renderable chart descriptors
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    charts: Vec<Arc<ChartDescriptor>>,
    declared_disabled: Vec<String>,
}

impl Catalog {
    /// Renderable descriptors in declaration order
    pub fn charts(&self) -> &[Arc<ChartDescriptor>] {
        &self.charts
    }

    /// Find a renderable descriptor by id
    pub fn get(&self, id: &str) -> Option<&Arc<ChartDescriptor>> {
        self.charts.iter().find(|c| c.id == id)
    }

    /// Ids of charts the catalog itself declares disabled
    pub fn declared_disabled(&self) -> &[String] {
        &self.declared_disabled
    }

    pub fn len(&self) -> usize {
        self.charts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Series;

    fn constant(_: &[Row], _: &StatsMap) -> SeriesTable {
        SeriesTable::from_series(vec![Series::new("c", vec![1.0, 2.0])])
    }

    fn draft(id: &str) -> ChartDraft {
        ChartDraft::new(id)
            .label(id.to_uppercase())
            .source("data.csv")
            .preprocess(constant)
    }

    #[test]
    fn test_build_keeps_order() {
        let catalog = CatalogBuilder::new()
            .add(draft("b"))
            .add(draft("a"))
            .build()
            .unwrap();
        let ids: Vec<_> = catalog.charts().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[test]
    fn test_declared_disabled_is_filtered() {
        let catalog = CatalogBuilder::new()
            .add(draft("a").disabled(false))
            .add(draft("b").disabled(true))
            .build()
            .unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get("b").is_none());
        assert_eq!(catalog.declared_disabled(), &["b".to_string()]);
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let err = CatalogBuilder::new()
            .add(draft("a"))
            .add(draft("a"))
            .build()
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateId("a".to_string()));
    }

    #[test]
    fn test_duplicate_check_covers_disabled_drafts() {
        let err = CatalogBuilder::new()
            .add(draft("a").disabled(true))
            .add(draft("a"))
            .build()
            .unwrap_err();
        assert_eq!(err, CatalogError::DuplicateId("a".to_string()));
    }

    #[test]
    fn test_missing_preprocess_rejected() {
        let err = CatalogBuilder::new()
            .add(ChartDraft::new("x").label("X").source("x.csv"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            CatalogError::MissingField {
                id: "x".to_string(),
                field: "preprocess"
            }
        );
        assert!(err.to_string().contains("preprocess"));
    }

    #[test]
    fn test_missing_source_and_empty_id_rejected() {
        let err = CatalogBuilder::new()
            .add(ChartDraft::new("x").label("X").preprocess(constant))
            .build()
            .unwrap_err();
        assert!(matches!(err, CatalogError::MissingField { field: "source", .. }));

        let err = CatalogBuilder::new().add(draft(" ")).build().unwrap_err();
        assert_eq!(err, CatalogError::EmptyId);
    }

    #[test]
    fn test_compute_applies_adjustment() {
        let descriptor = draft("a").adjust("per100k").into_descriptor().unwrap();
        let stats = crate::stats::prepare_stats(&[crate::stats::StatRecord::new("total", "50000")]);
        let table = descriptor.compute(&[], &stats);
        assert_eq!(table.series()[0].values, vec![2.0, 4.0]);
    }

    #[test]
    fn test_tick_formats() {
        assert_eq!(TickFormat::IndexToYear.format(3.0), "2003");
        assert_eq!(TickFormat::AgeGroup.format(2.0), "10-14");
        let categories = TickFormat::Categories(vec!["a".into(), "b".into()]);
        assert_eq!(categories.format(1.0), "b");
        assert_eq!(categories.format(1.5), "");
        assert_eq!(categories.format(9.0), "");
        assert_eq!(TickFormat::Hidden.format(1.0), "");
    }
}
