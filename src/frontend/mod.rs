//! Frontend module for egui UI
//!
//! This module provides the desktop viewer built on eframe/egui. Fetches run
//! on a background tokio runtime and come back through a crossbeam channel
//! ([`FetchBridge`]); everything else happens on the UI thread.
//!
//! # Layout
//!
//! - **Left**: preview list, one mini chart per catalog entry
//! - **Center**: page message, stat blocks of loaded runs, detail charts
//! - **Right**: run toggles
//! - **Bottom**: status bar
//!
//! # Main Types
//!
//! - [`ChartsApp`] - Main application state implementing [`eframe::App`]
//! - [`PlotView`] - Chart view rendered with egui_plot
//! - [`FetchBridge`] - Fetch runtime and result channel

pub mod bridge;
mod panels;
mod plot;

pub use bridge::{FetchBridge, FetchEvent};
pub use panels::*;
pub use plot::{ColorPalette, PlotView, PlotViewFactory};

use crate::controller::ChartController;

/// Actions emitted by panels, applied after the frame is laid out
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiAction {
    /// Preview click: enable the chart and scroll to it
    EnableChart(String),
    /// Hider click: flip the chart's disabled flag
    ToggleChartDisabled(String),
    /// Run toggle click
    ToggleRun(String),
}

/// Main application state for the chart viewer
pub struct ChartsApp {
    controller: ChartController<PlotViewFactory>,
    bridge: FetchBridge,
    /// Chart to scroll to on the next frame
    scroll_to: Option<String>,
}

impl ChartsApp {
    /// Create the app and start loading the run index
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        mut controller: ChartController<PlotViewFactory>,
        mut bridge: FetchBridge,
    ) -> Self {
        bridge.set_repaint(cc.egui_ctx.clone());
        controller.begin();
        bridge.fetch_runs(controller.runs_url());
        tracing::info!("Loading runs from {}", controller.fetcher().describe());

        Self {
            controller,
            bridge,
            scroll_to: None,
        }
    }

    /// Feed finished fetches to the controller. Returns true if any arrived.
    fn process_fetch_events(&mut self) -> bool {
        let events = self.bridge.drain();
        let had_events = !events.is_empty();

        for event in events {
            match event {
                FetchEvent::RunsIndex(result) => {
                    for request in self.controller.apply_runs(result) {
                        self.bridge.fetch_run(request);
                    }
                }
                FetchEvent::RunData(request, result) => {
                    let run_id = request.run_id.clone();
                    let completion = self.controller.complete_run_fetch(request, result);
                    tracing::debug!("Run '{}': {:?}", run_id, completion);
                }
            }
        }

        had_events
    }

    fn handle_action(&mut self, action: UiAction) {
        let result = match &action {
            UiAction::EnableChart(id) => self.controller.enable_chart(id),
            UiAction::ToggleChartDisabled(id) => {
                self.controller.toggle_chart_disabled(id).map(|_| ())
            }
            UiAction::ToggleRun(id) => self.controller.toggle_run(id).map(|request| {
                if let Some(request) = request {
                    self.bridge.fetch_run(request);
                }
            }),
        };
        if let Err(e) = result {
            tracing::warn!("{:?} failed: {}", action, e);
        }
        if let Some(target) = self.controller.take_scroll_target() {
            self.scroll_to = Some(target);
        }
    }
}

impl eframe::App for ChartsApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if self.process_fetch_events() {
            ctx.request_repaint();
        }

        let mut actions = Vec::new();
        let scroll_to = self.scroll_to.take();

        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            StatusBar::render(ui, &self.controller);
        });

        egui::SidePanel::left("previews")
            .resizable(true)
            .default_width(160.0)
            .show(ctx, |ui| {
                PreviewPanel::render(ui, &self.controller, &mut actions);
            });

        egui::SidePanel::right("runs")
            .resizable(true)
            .default_width(180.0)
            .show(ctx, |ui| {
                RunPanel::render(ui, &self.controller, &mut actions);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            DetailPanel::render(ui, &self.controller, scroll_to.as_deref(), &mut actions);
        });

        for action in actions {
            self.handle_action(action);
        }
    }
}
