//! Chart controller
//!
//! [`ChartController`] owns the canonical [`ChartState`] and ties together the
//! catalog, the state store, the fetcher and the view factory. Every user
//! interaction ends in [`ChartController::handle_state_change`], which saves
//! the state and re-renders the [`DisplayModel`].
//!
//! # Loading runs
//!
//! Loading a run is split in two so the GUI can run the fetch on a background
//! runtime:
//!
//! 1. [`ChartController::request_run_data`] marks the run `Loading`, bumps its
//!    generation and returns a [`RunRequest`].
//! 2. [`ChartController::complete_run_fetch`] applies the fetched payload, but
//!    only when the request's generation is still current. A toggle made while
//!    the fetch was in flight makes the completion stale, so the latest toggle
//!    always wins.
//!
//! [`ChartController::fetch_run_data`] and [`ChartController::start`] chain
//! both halves for callers that can await directly.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Deserialize;

use crate::catalog::Catalog;
use crate::config::{AppConfig, StateStore, DEFAULT_RUNS_INDEX, DEFAULT_STAT_FIELDS};
use crate::error::{ChartsError, Result};
use crate::fetch::{DataFetcher, FetchError, FetchResult};
use crate::render::{
    format_stat, DetailBlock, DisplayModel, PreviewEntry, RenderReport, RunToggle, StatBlock,
};
use crate::state::{ChartState, RunState, RunStatus};
use crate::types::{has_prefix, Run, RunPayload, SeriesTable};
use crate::view::{ChartView, ChartViews, ViewFactory};

/// Page message shown when the run index is empty
pub const NO_RUNS_MESSAGE: &str = "no charts found, please run the model";

/// Controller settings taken from the viewer config
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerSettings {
    /// Run index path, relative to the data source
    pub runs_index: String,
    /// Stat fields shown for loaded runs, in display order
    pub stat_fields: Vec<String>,
    /// Reload runs persisted as loaded once the index arrives
    pub restore_loaded_runs: bool,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            runs_index: DEFAULT_RUNS_INDEX.to_string(),
            stat_fields: DEFAULT_STAT_FIELDS.iter().map(|s| s.to_string()).collect(),
            restore_loaded_runs: true,
        }
    }
}

impl From<&AppConfig> for ControllerSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            runs_index: config.runs_index.clone(),
            stat_fields: config.stat_fields.clone(),
            restore_loaded_runs: config.restore_loaded_runs,
        }
    }
}

/// A pending run fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub run_id: String,
    /// Endpoint path of the run payload
    pub url: String,
    /// Run generation the request was made for
    pub generation: u64,
}

/// Result of applying a run fetch
#[derive(Debug, Clone, PartialEq)]
pub enum RunCompletion {
    /// Payload loaded into the views; number of series loaded
    Applied { series: usize },
    /// The run was toggled again while fetching; result discarded
    Stale,
    /// Fetch or decode failed; the run is marked failed
    Failed(String),
}

/// Result of [`ChartController::start`]
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// The run index is empty
    NoRuns,
    /// The run index could not be loaded
    Failed(String),
    /// Charts are displayed; completions of the restored runs
    Displayed { restored: Vec<RunCompletion> },
}

/// Orchestrates catalog, fetched run data and persisted state
pub struct ChartController<F: ViewFactory> {
    catalog: Catalog,
    store: StateStore,
    fetcher: Arc<DataFetcher>,
    factory: F,
    settings: ControllerSettings,
    state: ChartState<F::View>,
    display: DisplayModel,
    last_error: Option<String>,
}

impl<F: ViewFactory> ChartController<F> {
    pub fn new(
        catalog: Catalog,
        store: StateStore,
        fetcher: Arc<DataFetcher>,
        factory: F,
        settings: ControllerSettings,
    ) -> Self {
        let state = ChartState::from_catalog(&catalog);
        Self {
            catalog,
            store,
            fetcher,
            factory,
            settings,
            state,
            display: DisplayModel::default(),
            last_error: None,
        }
    }

    // ==================== Accessors ====================

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn state(&self) -> &ChartState<F::View> {
        &self.state
    }

    pub fn display_model(&self) -> &DisplayModel {
        &self.display
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    pub fn fetcher(&self) -> Arc<DataFetcher> {
        Arc::clone(&self.fetcher)
    }

    pub fn settings(&self) -> &ControllerSettings {
        &self.settings
    }

    /// Last save or fetch error, for the status line
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Live views of a chart, once rendered
    pub fn views(&self, chart_id: &str) -> Option<&ChartViews<F::View>> {
        self.state.chart(chart_id).and_then(|c| c.views.as_ref())
    }

    /// Clear the pending scroll target after the frontend scrolled to it
    pub fn take_scroll_target(&mut self) -> Option<String> {
        self.display.scroll_to.take()
    }

    // ==================== Startup ====================

    /// Merge the persisted state over the initial state
    pub fn begin(&mut self) {
        let state = std::mem::take(&mut self.state);
        self.state = self.store.merge(state);
    }

    /// Path of the run index
    pub fn runs_url(&self) -> &str {
        &self.settings.runs_index
    }

    /// Apply the fetched run index.
    ///
    /// Returns the fetches needed to restore runs that were loaded when the
    /// state was last saved.
    pub fn apply_runs(&mut self, result: FetchResult) -> Vec<RunRequest> {
        let runs = result.and_then(|value| {
            Vec::<Run>::deserialize(value.as_ref()).map_err(|e| FetchError::Decode {
                url: self.settings.runs_index.clone(),
                message: e.to_string(),
            })
        });

        let runs = match runs {
            Ok(runs) => runs,
            Err(e) => {
                tracing::warn!("Failed to load run index: {}", e);
                let message = format!("failed to load runs: {}", e);
                self.last_error = Some(message.clone());
                self.display.message = Some(message);
                return Vec::new();
            }
        };

        if runs.is_empty() {
            tracing::info!("Run index is empty");
            self.display.message = Some(NO_RUNS_MESSAGE.to_string());
            return Vec::new();
        }

        tracing::info!("Loaded {} runs", runs.len());
        self.state.runs = runs
            .into_iter()
            .map(|mut run| {
                run.loaded = false;
                RunState::new(run)
            })
            .collect();
        self.display.message = None;
        self.display();

        let restore = std::mem::take(&mut self.state.restore_runs);
        if !self.settings.restore_loaded_runs {
            return Vec::new();
        }

        let mut requests = Vec::new();
        for run_id in restore {
            match self.request_run_data(&run_id) {
                Ok(request) => requests.push(request),
                Err(e) => tracing::debug!("Not restoring run: {}", e),
            }
        }
        if !requests.is_empty() {
            tracing::info!("Restoring {} previously loaded runs", requests.len());
            self.display();
        }
        requests
    }

    /// Merge state, load the run index, display, then restore loaded runs
    pub async fn start(&mut self) -> StartOutcome {
        self.begin();

        let fetcher = Arc::clone(&self.fetcher);
        let result = fetcher.fetch_json(&self.settings.runs_index).await;
        let failed = result.as_ref().err().map(ToString::to_string);
        let requests = self.apply_runs(result);

        if let Some(message) = failed {
            return StartOutcome::Failed(message);
        }
        if self.state.runs.is_empty() {
            return StartOutcome::NoRuns;
        }

        let results =
            futures::future::join_all(requests.iter().map(|r| fetcher.fetch_json(&r.url))).await;
        let restored = requests
            .into_iter()
            .zip(results)
            .map(|(request, result)| self.complete_run_fetch(request, result))
            .collect();
        StartOutcome::Displayed { restored }
    }

    // ==================== Runs ====================

    /// Mark a run as loading and describe the fetch it needs
    pub fn request_run_data(&mut self, run_id: &str) -> Result<RunRequest> {
        let run = self
            .state
            .run_mut(run_id)
            .ok_or_else(|| ChartsError::UnknownRun(run_id.to_string()))?;
        run.generation += 1;
        run.status = RunStatus::Loading;
        let request = RunRequest {
            run_id: run_id.to_string(),
            url: run.run.data_path(),
            generation: run.generation,
        };
        self.clear_run_errors(run_id);
        tracing::debug!("Requesting {} (generation {})", request.url, request.generation);
        Ok(request)
    }

    /// Fetch a run's payload and load it into every chart
    pub async fn fetch_run_data(&mut self, run_id: &str) -> Result<RunCompletion> {
        let request = self.request_run_data(run_id)?;
        let fetcher = Arc::clone(&self.fetcher);
        let result = fetcher.fetch_json(&request.url).await;
        Ok(self.complete_run_fetch(request, result))
    }

    /// Apply a finished run fetch if it is still current
    pub fn complete_run_fetch(&mut self, request: RunRequest, result: FetchResult) -> RunCompletion {
        let current = self.state.run(&request.run_id).is_some_and(|run| {
            run.generation == request.generation && run.status == RunStatus::Loading
        });
        if !current {
            tracing::debug!(
                "Discarding stale result for run '{}' (generation {})",
                request.run_id,
                request.generation
            );
            return RunCompletion::Stale;
        }

        let payload = result.and_then(|value| {
            RunPayload::deserialize(value.as_ref()).map_err(|e| FetchError::Decode {
                url: request.url.clone(),
                message: e.to_string(),
            })
        });

        match payload {
            Ok(payload) => {
                let prefixed: BTreeMap<String, SeriesTable> = payload
                    .into_iter()
                    .map(|(chart_id, table)| (chart_id, table.prefixed(&request.run_id)))
                    .collect();
                let series = prefixed.values().map(SeriesTable::len).sum();
                self.load_chart_data(&prefixed);

                if let Some(run) = self.state.run_mut(&request.run_id) {
                    run.status = RunStatus::Loaded;
                    run.run.loaded = true;
                }
                self.clear_run_errors(&request.run_id);
                tracing::info!("Loaded run '{}' ({} series)", request.run_id, series);
                self.handle_state_change();
                RunCompletion::Applied { series }
            }
            Err(e) => {
                let message = e.to_string();
                tracing::warn!("Failed to load run '{}': {}", request.run_id, message);
                // A body that parsed as JSON stays cached; drop it so a retry refetches.
                self.fetcher.invalidate(&request.url);
                if let Some(run) = self.state.run_mut(&request.run_id) {
                    run.status = RunStatus::Failed(message.clone());
                    run.run.loaded = false;
                }
                for chart in &mut self.state.charts {
                    chart.errors.insert(request.run_id.clone(), message.clone());
                }
                self.last_error = Some(message.clone());
                self.handle_state_change();
                RunCompletion::Failed(message)
            }
        }
    }

    /// Flip a run on or off. Turning a run on returns the fetch to run.
    pub fn toggle_run(&mut self, run_id: &str) -> Result<Option<RunRequest>> {
        let active = self
            .state
            .run(run_id)
            .ok_or_else(|| ChartsError::UnknownRun(run_id.to_string()))?
            .status
            .is_active();

        let request = if active {
            if let Some(run) = self.state.run_mut(run_id) {
                run.generation += 1;
                run.status = RunStatus::Unloaded;
                run.run.loaded = false;
            }
            self.unload_chart_data(run_id);
            self.clear_run_errors(run_id);
            tracing::info!("Unloaded run '{}'", run_id);
            None
        } else {
            Some(self.request_run_data(run_id)?)
        };

        self.handle_state_change();
        Ok(request)
    }

    fn clear_run_errors(&mut self, run_id: &str) {
        for chart in &mut self.state.charts {
            chart.errors.remove(run_id);
        }
    }

    // ==================== Chart Data ====================

    fn ensure_views(&mut self) {
        let factory = &self.factory;
        for chart in &mut self.state.charts {
            if chart.views.is_none() {
                chart.views = Some(ChartViews::create(factory, &chart.descriptor.visual));
            }
        }
    }

    /// Unload every series whose id carries `{prefix}_` from both views
    pub fn unload_chart_data(&mut self, prefix: &str) {
        for chart in &mut self.state.charts {
            let Some(views) = chart.views.as_mut() else {
                continue;
            };
            let ids: Vec<String> = views
                .mini
                .data_ids()
                .into_iter()
                .filter(|id| has_prefix(id, prefix))
                .collect();
            if !ids.is_empty() {
                views.unload(&ids);
            }
        }
    }

    /// Load each chart's table (or an empty one) into both of its views
    pub fn load_chart_data(&mut self, data: &BTreeMap<String, SeriesTable>) {
        self.ensure_views();
        let empty = SeriesTable::new();
        for chart in &mut self.state.charts {
            let table = data.get(&chart.descriptor.id).unwrap_or(&empty);
            if let Some(views) = chart.views.as_mut() {
                views.load(table);
            }
        }
    }

    // ==================== Charts ====================

    /// Enable a chart and scroll to it (preview click)
    pub fn enable_chart(&mut self, chart_id: &str) -> Result<()> {
        let chart = self
            .state
            .chart_mut(chart_id)
            .ok_or_else(|| ChartsError::UnknownChart(chart_id.to_string()))?;
        chart.disabled = false;
        self.display.scroll_to = Some(chart_id.to_string());
        self.handle_state_change();
        Ok(())
    }

    /// Flip a chart's disabled flag (hider click); returns the new flag
    pub fn toggle_chart_disabled(&mut self, chart_id: &str) -> Result<bool> {
        let chart = self
            .state
            .chart_mut(chart_id)
            .ok_or_else(|| ChartsError::UnknownChart(chart_id.to_string()))?;
        chart.disabled = !chart.disabled;
        let disabled = chart.disabled;
        self.handle_state_change();
        Ok(disabled)
    }

    // ==================== Rendering ====================

    /// Persist the state, then re-render
    pub fn handle_state_change(&mut self) {
        if let Err(e) = self.store.save(&self.state) {
            tracing::warn!("Failed to save chart state: {}", e);
            self.last_error = Some(e.to_string());
        }
        self.display();
    }

    /// Reconcile the display model with the current state
    pub fn display(&mut self) {
        self.ensure_views();

        let stats: Vec<StatBlock> = self
            .state
            .runs
            .iter()
            .filter(|r| r.status == RunStatus::Loaded)
            .filter_map(|r| {
                let stats = r.run.stats.as_ref()?;
                let fields = self
                    .settings
                    .stat_fields
                    .iter()
                    .filter_map(|field| stats.get(field).map(|v| (field.clone(), format_stat(v))))
                    .collect();
                Some(StatBlock {
                    run_id: r.run.id.clone(),
                    label: r.run.display_label().to_string(),
                    color: r.run.color.clone(),
                    fields,
                })
            })
            .collect();

        let details: Vec<DetailBlock> = self
            .state
            .charts
            .iter()
            .map(|c| DetailBlock {
                chart_id: c.descriptor.id.clone(),
                label: c.descriptor.label.clone(),
                disabled: c.disabled,
                errors: c.errors.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
                series_count: c.views.as_ref().map_or(0, |v| v.full.series().len()),
            })
            .collect();

        let previews: Vec<PreviewEntry> = self
            .state
            .charts
            .iter()
            .map(|c| PreviewEntry {
                chart_id: c.descriptor.id.clone(),
                label: c.descriptor.label.clone(),
                disabled: c.disabled,
            })
            .collect();

        let toggles: Vec<RunToggle> = self
            .state
            .runs
            .iter()
            .map(|r| RunToggle {
                run_id: r.run.id.clone(),
                label: r.run.display_label().to_string(),
                color: r.run.color.clone(),
                status: r.status.clone(),
            })
            .collect();

        let report = RenderReport {
            stats: self.display.stats.reconcile(
                &stats,
                |b| b.run_id.clone(),
                StatBlock::clone,
                |entry, b| entry.clone_from(b),
            ),
            details: self.display.details.reconcile(
                &details,
                |b| b.chart_id.clone(),
                DetailBlock::clone,
                |entry, b| entry.clone_from(b),
            ),
            previews: self.display.previews.reconcile(
                &previews,
                |p| p.chart_id.clone(),
                PreviewEntry::clone,
                |entry, p| entry.clone_from(p),
            ),
            toggles: self.display.toggles.reconcile(
                &toggles,
                |t| t.run_id.clone(),
                RunToggle::clone,
                |entry, t| entry.clone_from(t),
            ),
        };

        self.display.renders += 1;
        self.display.last_report = report;
        tracing::trace!("Display pass {}: {:?}", self.display.renders, report.total());
    }
}
