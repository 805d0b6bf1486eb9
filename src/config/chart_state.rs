//! Chart state persistence
//!
//! The viewer remembers which charts the user hid and which runs were loaded.
//! Only a projection of [`ChartState`] is written: view handles and
//! preprocessing functions have no counterpart in [`PersistedState`], so they
//! can never reach the storage slot.
//!
//! | Aspect | Persisted chart state | Viewer config |
//! |--------|----------------------|---------------|
//! | **Purpose** | "What I was looking at" | "Where data comes from" |
//! | **Persistence** | Automatic, after every change | Edited by hand |
//! | **Format** | JSON, camelCase | TOML |
//! | **Location** | `{state_dir}/chartState-v1.json` | `app_data_dir()/config.toml` |
//!
//! Fields this version does not know about are kept in `extra` maps and
//! written back unchanged.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::storage::Storage;
use super::DEFAULT_STATE_KEY;
use crate::error::{ChartsError, Result};
use crate::state::ChartState;

/// Persisted projection of one chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedChart {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjust: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Persisted projection of one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRun {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub loaded: bool,
}

/// Everything written to the chart state slot
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedState {
    #[serde(default)]
    pub charts: Vec<PersistedChart>,
    #[serde(default)]
    pub runs: Vec<PersistedRun>,
    #[serde(default)]
    pub show_active_session: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PersistedState {
    /// Project the in-memory state
    pub fn from_state<V>(state: &ChartState<V>) -> Self {
        Self {
            charts: state
                .charts
                .iter()
                .map(|chart| {
                    let d = &chart.descriptor;
                    PersistedChart {
                        id: d.id.clone(),
                        label: Some(d.label.clone()),
                        source: Some(d.source.clone()),
                        group: d.group.clone(),
                        disabled: Some(chart.disabled),
                        adjust: d.adjust.clone(),
                        extra: chart.extra.clone(),
                    }
                })
                .collect(),
            runs: state
                .runs
                .iter()
                .map(|r| PersistedRun {
                    id: r.run.id.clone(),
                    label: r.run.label.clone(),
                    kind: Some(r.run.kind.clone()),
                    color: r.run.color.clone(),
                    loaded: r.status.is_active(),
                })
                .collect(),
            show_active_session: state.show_active_session,
            extra: state.extra.clone(),
        }
    }
}

/// Loads, merges and saves the chart state through a [`Storage`] slot
pub struct StateStore {
    storage: Box<dyn Storage>,
    key: String,
}

impl StateStore {
    /// Store using the default `chartState-v1` key
    pub fn new(storage: impl Storage + 'static) -> Self {
        Self::with_key(storage, DEFAULT_STATE_KEY)
    }

    pub fn with_key(storage: impl Storage + 'static, key: impl Into<String>) -> Self {
        Self {
            storage: Box::new(storage),
            key: key.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the persisted state.
    ///
    /// An absent slot or a failed read yields the empty state. A blob that
    /// does not parse is removed from storage so it cannot fail again.
    pub fn load(&self) -> PersistedState {
        let content = match self.storage.read(&self.key) {
            Ok(Some(content)) => content,
            Ok(None) => return PersistedState::default(),
            Err(e) => {
                tracing::warn!("Failed to read chart state '{}': {}, starting empty", self.key, e);
                return PersistedState::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(state) => {
                tracing::debug!("Loaded chart state '{}'", self.key);
                state
            }
            Err(e) => {
                tracing::warn!(
                    "Discarding unparsable chart state '{}': {}, starting empty",
                    self.key,
                    e
                );
                if let Err(e) = self.storage.remove(&self.key) {
                    tracing::warn!("Failed to remove chart state '{}': {}", self.key, e);
                }
                PersistedState::default()
            }
        }
    }

    /// Overlay the persisted state underneath `state`.
    ///
    /// Persisted records are matched to charts by id (first duplicate wins).
    /// A chart whose descriptor declares `disabled` keeps the declared value;
    /// otherwise the persisted flag is restored. Unknown persisted fields are
    /// kept, with the live state winning on conflicts. Persisted records for
    /// charts no longer in the catalog are dropped.
    pub fn merge<V>(&self, mut state: ChartState<V>) -> ChartState<V> {
        let persisted = self.load();

        let mut by_id: HashMap<&str, &PersistedChart> = HashMap::new();
        for record in &persisted.charts {
            by_id.entry(record.id.as_str()).or_insert(record);
        }

        for chart in &mut state.charts {
            let Some(record) = by_id.get(chart.descriptor.id.as_str()) else {
                continue;
            };
            chart.disabled = match chart.descriptor.disabled {
                Some(declared) => declared,
                None => record.disabled.unwrap_or(chart.disabled),
            };
            chart.extra = overlay(&record.extra, std::mem::take(&mut chart.extra));
        }

        state.extra = overlay(&persisted.extra, std::mem::take(&mut state.extra));
        state.show_active_session = true;
        state.restore_runs = persisted
            .runs
            .iter()
            .filter(|r| r.loaded)
            .map(|r| r.id.clone())
            .collect();

        tracing::debug!(
            "Merged chart state: {} persisted charts, {} runs to restore",
            persisted.charts.len(),
            state.restore_runs.len()
        );
        state
    }

    /// Replace the slot with the projection of `state`
    pub fn save<V>(&self, state: &ChartState<V>) -> Result<()> {
        let content = serde_json::to_string(&PersistedState::from_state(state))?;
        self.storage.write(&self.key, &content).map_err(|e| {
            ChartsError::State(format!("Failed to write chart state '{}': {}", self.key, e))
        })?;
        tracing::trace!("Saved chart state '{}'", self.key);
        Ok(())
    }
}

fn overlay(under: &Map<String, Value>, over: Map<String, Value>) -> Map<String, Value> {
    let mut merged = under.clone();
    merged.extend(over);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CatalogBuilder, ChartDraft};
    use crate::config::MemoryStorage;
    use crate::state::{RunState, RunStatus};
    use crate::types::{Run, SeriesTable};
    use crate::view::MemoryView;

    fn empty(_: &[crate::catalog::Row], _: &crate::stats::StatsMap) -> SeriesTable {
        SeriesTable::new()
    }

    fn state(drafts: Vec<ChartDraft>) -> ChartState<MemoryView> {
        let catalog = drafts
            .into_iter()
            .fold(CatalogBuilder::new(), |b, d| b.add(d))
            .build()
            .unwrap();
        ChartState::from_catalog(&catalog)
    }

    fn draft(id: &str) -> ChartDraft {
        ChartDraft::new(id).label(id).source("x.csv").preprocess(empty)
    }

    #[test]
    fn test_missing_slot_merges_to_defaults() {
        let store = StateStore::new(MemoryStorage::new());
        let merged = store.merge(state(vec![draft("a")]));
        assert!(!merged.charts[0].disabled);
        assert!(merged.show_active_session);
        assert!(merged.restore_runs.is_empty());
    }

    #[test]
    fn test_first_duplicate_record_wins() {
        let storage = MemoryStorage::with_slot(
            DEFAULT_STATE_KEY,
            r#"{"charts":[{"id":"a","disabled":true},{"id":"a","disabled":false}]}"#,
        );
        let merged = StateStore::new(storage).merge(state(vec![draft("a")]));
        assert!(merged.charts[0].disabled);
    }

    #[test]
    fn test_extra_fields_round_trip() {
        let storage = MemoryStorage::with_slot(
            DEFAULT_STATE_KEY,
            r#"{"charts":[{"id":"a","zoom":3}],"runs":[],"theme":"dark"}"#,
        );
        let store = StateStore::new(storage.clone());
        let merged = store.merge(state(vec![draft("a")]));
        store.save(&merged).unwrap();

        let saved: Value = serde_json::from_str(&storage.get(DEFAULT_STATE_KEY).unwrap()).unwrap();
        assert_eq!(saved["theme"], "dark");
        assert_eq!(saved["charts"][0]["zoom"], 3);
        assert_eq!(saved["showActiveSession"], true);
    }

    #[test]
    fn test_loaded_runs_are_remembered() {
        let storage = MemoryStorage::with_slot(
            DEFAULT_STATE_KEY,
            r#"{"runs":[{"id":"r1","loaded":true},{"id":"r2","loaded":false}]}"#,
        );
        let merged = StateStore::new(storage).merge(state(vec![draft("a")]));
        assert_eq!(merged.restore_runs, vec!["r1"]);
    }

    #[test]
    fn test_loading_runs_are_saved_as_loaded() {
        let storage = MemoryStorage::new();
        let store = StateStore::new(storage.clone());
        let mut current = state(vec![draft("a")]);
        let mut loading = RunState::new(Run::new("r1"));
        loading.status = RunStatus::Loading;
        let mut failed = RunState::new(Run::new("r2"));
        failed.status = RunStatus::Failed("boom".to_string());
        current.runs = vec![loading, failed, RunState::new(Run::new("r3"))];
        store.save(&current).unwrap();

        let saved: Value = serde_json::from_str(&storage.get(DEFAULT_STATE_KEY).unwrap()).unwrap();
        let loaded: Vec<bool> = saved["runs"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["loaded"].as_bool().unwrap())
            .collect();
        assert_eq!(loaded, vec![true, false, false]);

        let merged = store.merge(state(vec![draft("a")]));
        assert_eq!(merged.restore_runs, vec!["r1"]);
    }

    #[test]
    fn test_saved_projection_has_no_view_fields() {
        let storage = MemoryStorage::new();
        let store = StateStore::with_key(storage.clone(), "custom");
        store.save(&state(vec![draft("a").group("g")])).unwrap();

        let saved: Value = serde_json::from_str(&storage.get("custom").unwrap()).unwrap();
        let chart = saved["charts"][0].as_object().unwrap();
        let mut keys: Vec<_> = chart.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec!["disabled", "group", "id", "label", "source"]);
    }
}
