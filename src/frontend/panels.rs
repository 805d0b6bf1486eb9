//! Panel components for the frontend UI
//!
//! Panels read the controller's display model and never mutate it. Clicks are
//! returned as [`UiAction`]s that the app applies after the frame is laid out.
//!
//! # Panels
//!
//! - [`PreviewPanel`] - Mini chart list with hide buttons (left)
//! - [`DetailPanel`] - Page message, run stats and detail charts (center)
//! - [`RunPanel`] - Run toggles with color stripes and loading state (right)
//! - [`StatusBar`] - Data source, chart count and the last error (bottom)

use egui::{Color32, RichText, Ui};

use super::plot::{ColorPalette, PlotView, PlotViewFactory};
use super::UiAction;
use crate::controller::ChartController;
use crate::render::{DetailBlock, PreviewEntry, RunToggle, StatBlock};
use crate::state::RunStatus;

type Controller = ChartController<PlotViewFactory>;

const DISABLED_ALPHA: f32 = 0.4;

fn mini_view<'a>(controller: &'a Controller, chart_id: &str) -> Option<&'a PlotView> {
    controller.views(chart_id).map(|v| &v.mini)
}

fn full_view<'a>(controller: &'a Controller, chart_id: &str) -> Option<&'a PlotView> {
    controller.views(chart_id).map(|v| &v.full)
}

fn run_color(color: Option<&str>) -> Color32 {
    color
        .and_then(ColorPalette::parse_hex)
        .unwrap_or(Color32::GRAY)
}

/// Renders the preview list
pub struct PreviewPanel;

impl PreviewPanel {
    pub fn render(ui: &mut Ui, controller: &Controller, actions: &mut Vec<UiAction>) {
        egui::ScrollArea::vertical().show(ui, |ui| {
            for entry in controller.display_model().previews.values() {
                Self::render_entry(ui, controller, entry, actions);
                ui.add_space(4.0);
            }
        });
    }

    fn render_entry(
        ui: &mut Ui,
        controller: &Controller,
        entry: &PreviewEntry,
        actions: &mut Vec<UiAction>,
    ) {
        ui.group(|ui| {
            if entry.disabled {
                ui.multiply_opacity(DISABLED_ALPHA);
            }
            ui.horizontal(|ui| {
                if ui
                    .selectable_label(false, RichText::new(&entry.label).small())
                    .on_hover_text("Show this chart")
                    .clicked()
                {
                    actions.push(UiAction::EnableChart(entry.chart_id.clone()));
                }
                ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                    let hint = if entry.disabled { "Show" } else { "Hide" };
                    if ui.small_button("×").on_hover_text(hint).clicked() {
                        actions.push(UiAction::ToggleChartDisabled(entry.chart_id.clone()));
                    }
                });
            });
            if let Some(view) = mini_view(controller, &entry.chart_id) {
                view.render(ui, entry.disabled);
            }
        });
    }
}

/// Renders the page message, stat blocks and detail charts
pub struct DetailPanel;

impl DetailPanel {
    pub fn render(
        ui: &mut Ui,
        controller: &Controller,
        scroll_to: Option<&str>,
        actions: &mut Vec<UiAction>,
    ) {
        let model = controller.display_model();
        if let Some(message) = &model.message {
            ui.vertical_centered(|ui| {
                ui.add_space(40.0);
                ui.heading(message.as_str());
            });
            return;
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            if !model.stats.is_empty() {
                ui.horizontal_wrapped(|ui| {
                    for block in model.stats.values() {
                        Self::render_stats(ui, block);
                    }
                });
                ui.separator();
            }

            for block in model.details.values() {
                let response = ui
                    .group(|ui| Self::render_detail(ui, controller, block, actions))
                    .response;
                if scroll_to == Some(block.chart_id.as_str()) {
                    response.scroll_to_me(Some(egui::Align::TOP));
                }
                ui.add_space(8.0);
            }
        });
    }

    fn render_stats(ui: &mut Ui, block: &StatBlock) {
        ui.group(|ui| {
            ui.vertical(|ui| {
                ui.colored_label(
                    run_color(block.color.as_deref()),
                    RichText::new(&block.label).strong(),
                );
                egui::Grid::new(("stats", &block.run_id))
                    .num_columns(2)
                    .show(ui, |ui| {
                        for (field, value) in &block.fields {
                            ui.label(RichText::new(field).small());
                            ui.label(RichText::new(value).small().monospace());
                            ui.end_row();
                        }
                    });
            });
        });
    }

    fn render_detail(
        ui: &mut Ui,
        controller: &Controller,
        block: &DetailBlock,
        actions: &mut Vec<UiAction>,
    ) {
        ui.horizontal(|ui| {
            ui.heading(block.label.as_str());
            if block.disabled {
                ui.label(RichText::new("hidden").italics().color(Color32::GRAY));
                if ui.small_button("Show").clicked() {
                    actions.push(UiAction::EnableChart(block.chart_id.clone()));
                }
            } else if ui.small_button("Hide").clicked() {
                actions.push(UiAction::ToggleChartDisabled(block.chart_id.clone()));
            }
        });

        for (run_id, message) in &block.errors {
            ui.colored_label(Color32::LIGHT_RED, format!("⚠ {}: {}", run_id, message));
        }

        if block.disabled {
            ui.multiply_opacity(DISABLED_ALPHA);
        }
        if let Some(view) = full_view(controller, &block.chart_id) {
            view.render(ui, block.disabled);
        }
    }
}

/// Renders the run toggles
pub struct RunPanel;

impl RunPanel {
    pub fn render(ui: &mut Ui, controller: &Controller, actions: &mut Vec<UiAction>) {
        ui.heading("Runs");
        ui.separator();

        let toggles = &controller.display_model().toggles;
        if toggles.is_empty() {
            ui.label(RichText::new("No runs").italics().color(Color32::GRAY));
            return;
        }

        egui::ScrollArea::vertical().show(ui, |ui| {
            for toggle in toggles.values() {
                Self::render_toggle(ui, toggle, actions);
            }
        });
    }

    fn render_toggle(ui: &mut Ui, toggle: &RunToggle, actions: &mut Vec<UiAction>) {
        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(egui::vec2(4.0, 18.0), egui::Sense::hover());
            ui.painter()
                .rect_filled(rect, 1.0, run_color(toggle.color.as_deref()));

            let mut checked = toggle.checked();
            let response = ui.checkbox(&mut checked, toggle.label.as_str());
            if response.changed() {
                actions.push(UiAction::ToggleRun(toggle.run_id.clone()));
            }

            if toggle.loading() {
                ui.spinner();
            }
            if let RunStatus::Failed(message) = &toggle.status {
                ui.colored_label(Color32::LIGHT_RED, "⚠").on_hover_text(message.as_str());
            }
        });
    }
}

/// Renders the bottom status bar
pub struct StatusBar;

impl StatusBar {
    pub fn render(ui: &mut Ui, controller: &Controller) {
        ui.horizontal(|ui| {
            ui.spacing_mut().item_spacing.x = 8.0;

            ui.label(RichText::new(controller.fetcher().describe()).small());
            ui.separator();

            let charts = controller.catalog().len();
            let loaded = controller
                .state()
                .runs
                .iter()
                .filter(|r| r.status == RunStatus::Loaded)
                .count();
            ui.label(RichText::new(format!("Charts: {}  Runs loaded: {}", charts, loaded)).small());

            if let Some(error) = controller.last_error() {
                ui.separator();
                ui.colored_label(Color32::LIGHT_RED, RichText::new(error).small());
            }
        });
    }
}
