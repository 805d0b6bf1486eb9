//! Chart view seam
//!
//! Every chart has two live views built from its [`VisualConfig`]: a small
//! preview ("mini") and a large detail view ("full"). Views only understand
//! two operations, loading a table of series (upsert by series id) and
//! unloading series by id. Drawing is up to the implementation.
//!
//! # Main Types
//!
//! - [`ChartView`] - The load/unload surface a chart view exposes
//! - [`ViewFactory`] - Builds views from a visual config
//! - [`ChartViews`] - The mini/full pair owned by one chart
//! - [`MemoryView`] - Headless view that only records its series

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::catalog::VisualConfig;
use crate::types::{Series, SeriesTable};

/// Which of the two paired views is being created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Mini,
    Full,
}

/// A live chart view
pub trait ChartView {
    /// Upsert every series of `table` by id. Existing series keep their position.
    fn load(&mut self, table: &SeriesTable);

    /// Remove the series with the given ids; unknown ids are ignored
    fn unload(&mut self, ids: &[String]);

    /// Ids of the loaded series, in load order
    fn data_ids(&self) -> Vec<String> {
        self.series().iter().map(|s| s.id.clone()).collect()
    }

    /// Loaded series, in load order
    fn series(&self) -> &[Series];
}

/// Builds chart views
pub trait ViewFactory {
    type View: ChartView;

    fn create(&self, kind: ViewKind, config: &VisualConfig) -> Self::View;
}

/// The two views of one chart
#[derive(Debug)]
pub struct ChartViews<V> {
    pub mini: V,
    pub full: V,
}

impl<V: ChartView> ChartViews<V> {
    pub fn create<F>(factory: &F, config: &VisualConfig) -> Self
    where
        F: ViewFactory<View = V>,
    {
        Self {
            mini: factory.create(ViewKind::Mini, config),
            full: factory.create(ViewKind::Full, config),
        }
    }

    /// Load the same table into both views
    pub fn load(&mut self, table: &SeriesTable) {
        self.mini.load(table);
        self.full.load(table);
    }

    /// Unload the same ids from both views
    pub fn unload(&mut self, ids: &[String]) {
        self.mini.unload(ids);
        self.full.unload(ids);
    }
}

// ==================== Series Store ====================

/// Ordered series collection with upsert-by-id semantics.
///
/// Shared by [`MemoryView`] and the plot views of the frontend.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeriesStore {
    series: Vec<Series>,
}

impl SeriesStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, table: &SeriesTable) {
        for incoming in table.series() {
            match self.series.iter_mut().find(|s| s.id == incoming.id) {
                Some(existing) => existing.values = incoming.values.clone(),
                None => self.series.push(incoming.clone()),
            }
        }
    }

    pub fn unload(&mut self, ids: &[String]) {
        self.series.retain(|s| !ids.contains(&s.id));
    }

    pub fn series(&self) -> &[Series] {
        &self.series
    }

    pub fn get(&self, id: &str) -> Option<&Series> {
        self.series.iter().find(|s| s.id == id)
    }
}

// ==================== Memory View ====================

/// Headless view recording what was loaded into it
#[derive(Debug, Clone)]
pub struct MemoryView {
    pub kind: ViewKind,
    pub config: VisualConfig,
    store: SeriesStore,
    /// Number of `load` calls received, including empty loads
    pub load_calls: usize,
}

impl MemoryView {
    pub fn new(kind: ViewKind, config: VisualConfig) -> Self {
        Self {
            kind,
            config,
            store: SeriesStore::new(),
            load_calls: 0,
        }
    }

    /// Values of a loaded series
    pub fn values(&self, id: &str) -> Option<&[f64]> {
        self.store.get(id).map(|s| s.values.as_slice())
    }
}

impl ChartView for MemoryView {
    fn load(&mut self, table: &SeriesTable) {
        self.load_calls += 1;
        self.store.load(table);
    }

    fn unload(&mut self, ids: &[String]) {
        self.store.unload(ids);
    }

    fn series(&self) -> &[Series] {
        self.store.series()
    }
}

/// Factory for [`MemoryView`]s; clones share the creation counter
#[derive(Debug, Clone, Default)]
pub struct MemoryViewFactory {
    created: Arc<AtomicUsize>,
}

impl MemoryViewFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of views created so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

impl ViewFactory for MemoryViewFactory {
    type View = MemoryView;

    fn create(&self, kind: ViewKind, config: &VisualConfig) -> MemoryView {
        self.created.fetch_add(1, Ordering::Relaxed);
        MemoryView::new(kind, config.clone())
    }
}
