//! Test data builders for catalogs, run indexes and payloads

use epicharts::catalog::{CatalogBuilder, ChartDraft, Row};
use epicharts::stats::StatsMap;
use epicharts::{Catalog, SeriesTable};
use serde_json::{json, Value};

fn no_data(_: &[Row], _: &StatsMap) -> SeriesTable {
    SeriesTable::new()
}

/// Builder for small test catalogs
#[derive(Default)]
pub struct CatalogFixture {
    charts: Vec<(String, Option<bool>)>,
}

impl CatalogFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chart that leaves `disabled` undeclared
    pub fn chart(mut self, id: &str) -> Self {
        self.charts.push((id.to_string(), None));
        self
    }

    /// Add a chart that declares its `disabled` flag
    pub fn declared(mut self, id: &str, disabled: bool) -> Self {
        self.charts.push((id.to_string(), Some(disabled)));
        self
    }

    pub fn build(self) -> Catalog {
        let mut builder = CatalogBuilder::new();
        for (id, disabled) in self.charts {
            let mut draft = ChartDraft::new(id.as_str())
                .label(format!("Chart {}", id))
                .source(format!("{}.csv", id))
                .preprocess(no_data);
            if let Some(disabled) = disabled {
                draft = draft.disabled(disabled);
            }
            builder = builder.add(draft);
        }
        builder.build().expect("test catalog is valid")
    }
}

/// Builder for `runs.json` bodies
#[derive(Default)]
pub struct RunIndexBuilder {
    runs: Vec<Value>,
}

impl RunIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session(mut self, id: &str) -> Self {
        self.runs.push(json!({ "id": id, "label": format!("Run {}", id), "type": "session" }));
        self
    }

    pub fn with_stats(mut self, id: &str, stats: Value) -> Self {
        self.runs.push(json!({ "id": id, "type": "session", "stats": stats }));
        self
    }

    pub fn body(self) -> String {
        Value::Array(self.runs).to_string()
    }
}

/// Endpoint path of a session run's payload
pub fn session_path(run_id: &str) -> String {
    format!("api/session/{}.json", run_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_fixture() {
        let catalog = CatalogFixture::new()
            .chart("a")
            .declared("b", false)
            .declared("c", true)
            .build();

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.declared_disabled(), ["c".to_string()]);
        assert_eq!(catalog.get("b").and_then(|c| c.disabled), Some(false));
    }
}
