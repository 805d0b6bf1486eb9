//! In-memory chart state owned by the controller
//!
//! [`ChartState`] overlays runtime data on top of the immutable catalog: the
//! user-toggled `disabled` flag of each chart, errors recorded per run, the
//! live views, and the status of every run in the index. Only a projection
//! of it is ever persisted (see [`crate::config::chart_state`]).

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::catalog::{Catalog, ChartDescriptor};
use crate::types::Run;
use crate::view::ChartViews;

/// Runtime overlay of one catalog entry
#[derive(Debug)]
pub struct ChartRuntimeState<V> {
    pub descriptor: Arc<ChartDescriptor>,
    /// User-toggled disabled flag
    pub disabled: bool,
    /// Persisted fields this version does not know about, carried forward on save
    pub extra: Map<String, Value>,
    /// Fetch errors by run id
    pub errors: BTreeMap<String, String>,
    /// Live views, created on first render
    pub views: Option<ChartViews<V>>,
}

impl<V> ChartRuntimeState<V> {
    pub fn new(descriptor: Arc<ChartDescriptor>) -> Self {
        Self {
            disabled: descriptor.disabled.unwrap_or(false),
            descriptor,
            extra: Map::new(),
            errors: BTreeMap::new(),
            views: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.descriptor.id
    }
}

/// Loading status of a run
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RunStatus {
    #[default]
    Unloaded,
    Loading,
    Loaded,
    Failed(String),
}

impl RunStatus {
    /// Whether the run counts as toggled on
    pub fn is_active(&self) -> bool {
        matches!(self, RunStatus::Loading | RunStatus::Loaded)
    }
}

/// A run from the index plus its runtime status
#[derive(Debug, Clone, PartialEq)]
pub struct RunState {
    pub run: Run,
    pub status: RunStatus,
    /// Bumped by every toggle; completions from older generations are stale
    pub generation: u64,
}

impl RunState {
    pub fn new(run: Run) -> Self {
        Self {
            run,
            status: RunStatus::Unloaded,
            generation: 0,
        }
    }

    pub fn id(&self) -> &str {
        &self.run.id
    }
}

/// Canonical in-memory state of the viewer
#[derive(Debug)]
pub struct ChartState<V> {
    pub charts: Vec<ChartRuntimeState<V>>,
    pub runs: Vec<RunState>,
    pub show_active_session: bool,
    /// Top-level persisted fields this version does not know about
    pub extra: Map<String, Value>,
    /// Ids of runs persisted as loaded, waiting for the run index
    pub restore_runs: Vec<String>,
}

impl<V> Default for ChartState<V> {
    fn default() -> Self {
        Self {
            charts: Vec::new(),
            runs: Vec::new(),
            show_active_session: false,
            extra: Map::new(),
            restore_runs: Vec::new(),
        }
    }
}

impl<V> ChartState<V> {
    /// Initial state for a catalog: one overlay per renderable chart, no runs
    pub fn from_catalog(catalog: &Catalog) -> Self {
        Self {
            charts: catalog
                .charts()
                .iter()
                .map(|d| ChartRuntimeState::new(Arc::clone(d)))
                .collect(),
            ..Default::default()
        }
    }

    pub fn chart(&self, id: &str) -> Option<&ChartRuntimeState<V>> {
        self.charts.iter().find(|c| c.id() == id)
    }

    pub fn chart_mut(&mut self, id: &str) -> Option<&mut ChartRuntimeState<V>> {
        self.charts.iter_mut().find(|c| c.id() == id)
    }

    pub fn run(&self, id: &str) -> Option<&RunState> {
        self.runs.iter().find(|r| r.id() == id)
    }

    pub fn run_mut(&mut self, id: &str) -> Option<&mut RunState> {
        self.runs.iter_mut().find(|r| r.id() == id)
    }
}
