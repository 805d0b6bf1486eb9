//! Chart views rendered with egui_plot
//!
//! A [`PlotView`] is the frontend's [`ChartView`]: it stores the loaded series
//! and draws them as lines, filled areas or bars depending on the chart's
//! [`VisualConfig`]. Mini views are small, axis-less previews; full views get
//! axis labels, tick formatting and a legend.
//!
//! # Main Types
//!
//! - [`PlotView`] - Series store plus plot configuration
//! - [`PlotViewFactory`] - Creates plot views with unique plot ids
//! - [`ColorPalette`] - Stable colors per series id

use std::sync::atomic::{AtomicUsize, Ordering};

use egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, Corner, GridMark, Legend, Line, Plot, PlotPoints, PlotUi, Points};

use crate::catalog::{ChartType, TickFormat, VisualConfig};
use crate::config::ViewSize;
use crate::types::{Series, SeriesTable};
use crate::view::{ChartView, SeriesStore, ViewFactory, ViewKind};

/// Fixed set of series colors
pub struct ColorPalette;

impl ColorPalette {
    const COLORS: [Color32; 10] = [
        Color32::from_rgb(31, 119, 180),
        Color32::from_rgb(255, 127, 14),
        Color32::from_rgb(44, 160, 44),
        Color32::from_rgb(214, 39, 40),
        Color32::from_rgb(148, 103, 189),
        Color32::from_rgb(140, 86, 75),
        Color32::from_rgb(227, 119, 194),
        Color32::from_rgb(127, 127, 127),
        Color32::from_rgb(188, 189, 34),
        Color32::from_rgb(23, 190, 207),
    ];

    /// Color for a series id; the same id always gets the same color
    pub fn color_for(id: &str) -> Color32 {
        let hash = id
            .bytes()
            .fold(0u32, |h, b| h.wrapping_mul(31).wrapping_add(b as u32));
        Self::COLORS[hash as usize % Self::COLORS.len()]
    }

    /// Parse a `#rrggbb` color, as used by run colors
    pub fn parse_hex(color: &str) -> Option<Color32> {
        let hex = color.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
        Some(Color32::from_rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// A chart view drawn with egui_plot
#[derive(Debug, Clone)]
pub struct PlotView {
    plot_id: String,
    kind: ViewKind,
    config: VisualConfig,
    size: ViewSize,
    store: SeriesStore,
    /// Line width for line and area charts
    pub line_width: f32,
}

impl PlotView {
    pub fn new(plot_id: impl Into<String>, kind: ViewKind, config: VisualConfig, size: ViewSize) -> Self {
        Self {
            plot_id: plot_id.into(),
            kind,
            config,
            size,
            store: SeriesStore::new(),
            line_width: match kind {
                ViewKind::Mini => 1.0,
                ViewKind::Full => 1.5,
            },
        }
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    pub fn size(&self) -> ViewSize {
        self.size
    }

    /// Draw the view; `dimmed` fades every series (disabled charts)
    pub fn render(&self, ui: &mut Ui, dimmed: bool) {
        let mini = self.kind == ViewKind::Mini;
        let mut plot = Plot::new(&self.plot_id)
            .width(self.size.width)
            .height(self.size.height)
            .show_axes(!mini)
            .show_grid(!mini)
            .allow_zoom(!mini)
            .allow_drag(!mini)
            .allow_scroll(!mini)
            .allow_boxed_zoom(!mini)
            .show_x(!mini)
            .show_y(!mini);

        if !mini {
            plot = plot.legend(Legend::default().position(Corner::RightTop));
            if let Some(label) = &self.config.x_axis.label {
                plot = plot.x_axis_label(label.clone());
            }
            if let Some(label) = &self.config.y_axis.label {
                plot = plot.y_axis_label(label.clone());
            }
            let x_format = self.config.x_axis.tick_format.clone();
            plot = plot.x_axis_formatter(move |mark: GridMark, _range| x_format.format(mark.value));
            let y_format = self.config.y_axis.tick_format.clone();
            if y_format != TickFormat::Value {
                plot = plot.y_axis_formatter(move |mark: GridMark, _range| y_format.format(mark.value));
            }
        }
        if let Some(min) = self.config.y_axis.min {
            plot = plot.include_y(min);
        }

        let series = self.store.series();
        let config = &self.config;
        let width = self.line_width;
        let point_radius = if mini { None } else { config.point_radius };
        plot.show(ui, |plot_ui| match config.chart_type {
            ChartType::Bar => draw_bars(plot_ui, series, config, dimmed),
            ChartType::Line | ChartType::Area => {
                for s in series {
                    let coords = series_points(s, config.x_axis.min);
                    let color = series_color(&s.id, dimmed);
                    if let Some(radius) = point_radius.filter(|r| *r > 0.0) {
                        plot_ui.points(
                            Points::new(s.id.clone(), PlotPoints::from(coords.clone()))
                                .color(color)
                                .radius(radius),
                        );
                    }
                    let mut line = Line::new(s.id.clone(), PlotPoints::from(coords))
                        .color(color)
                        .width(width);
                    if config.chart_type == ChartType::Area {
                        line = line.fill(0.0);
                    }
                    plot_ui.line(line);
                }
            }
        });
    }
}

fn series_color(id: &str, dimmed: bool) -> Color32 {
    let color = ColorPalette::color_for(id);
    if dimmed {
        color.gamma_multiply(0.3)
    } else {
        color
    }
}

/// `[index, value]` points of a series, skipping non-finite values and
/// indices below `x_min`
fn series_points(series: &Series, x_min: Option<f64>) -> Vec<[f64; 2]> {
    series
        .values
        .iter()
        .enumerate()
        .map(|(i, v)| [i as f64, *v])
        .filter(|[x, y]| y.is_finite() && x_min.map_or(true, |min| *x >= min))
        .collect()
}

/// Stacking key of a series: its run prefix and the index of its group.
///
/// Series of different runs never share a stack, even when their labels
/// belong to the same group.
fn stack_key(config: &VisualConfig, id: &str) -> Option<(String, usize)> {
    config.groups.iter().enumerate().find_map(|(index, group)| {
        group.iter().find_map(|label| {
            if id == label {
                Some((String::new(), index))
            } else if id.len() > label.len() + 1 && id.ends_with(&format!("_{}", label)) {
                Some((id[..id.len() - label.len() - 1].to_string(), index))
            } else {
                None
            }
        })
    })
}

fn draw_bars(plot_ui: &mut PlotUi, series: &[Series], config: &VisualConfig, dimmed: bool) {
    // Each run's stacking group shares one slot; ungrouped series get their own.
    let mut slots: Vec<Option<(String, usize)>> = Vec::new();
    for s in series {
        let group = stack_key(config, &s.id);
        if group.is_none() || !slots.contains(&group) {
            slots.push(group);
        }
    }
    let slot_count = slots.len().max(1);
    let bar_width = 0.8 / slot_count as f64;

    let mut charts: Vec<(Option<(String, usize)>, BarChart)> = Vec::new();
    let mut ungrouped_slot = 0usize;
    for s in series {
        let group = stack_key(config, &s.id);
        let slot = match group {
            Some(_) => slots.iter().position(|g| *g == group).unwrap_or(0),
            None => {
                let slot = slots
                    .iter()
                    .enumerate()
                    .filter(|(_, g)| g.is_none())
                    .nth(ungrouped_slot)
                    .map(|(i, _)| i)
                    .unwrap_or(0);
                ungrouped_slot += 1;
                slot
            }
        };
        let offset = (slot as f64 - (slot_count as f64 - 1.0) / 2.0) * bar_width;

        let bars: Vec<Bar> = series_points(s, config.x_axis.min)
            .into_iter()
            .map(|[x, y]| Bar::new(x + offset, y).width(bar_width))
            .collect();
        let mut chart = BarChart::new(s.id.clone(), bars).color(series_color(&s.id, dimmed));
        if group.is_some() {
            let below: Vec<&BarChart> = charts
                .iter()
                .filter(|(g, _)| *g == group)
                .map(|(_, c)| c)
                .collect();
            if !below.is_empty() {
                chart = chart.stack_on(&below);
            }
        }
        charts.push((group, chart));
    }

    for (_, chart) in charts {
        plot_ui.bar_chart(chart);
    }
}

impl ChartView for PlotView {
    fn load(&mut self, table: &SeriesTable) {
        self.store.load(table);
    }

    fn unload(&mut self, ids: &[String]) {
        self.store.unload(ids);
    }

    fn series(&self) -> &[Series] {
        self.store.series()
    }
}

/// Creates [`PlotView`]s sized from the viewer config
#[derive(Debug)]
pub struct PlotViewFactory {
    mini_size: ViewSize,
    full_size: ViewSize,
    next_id: AtomicUsize,
}

impl PlotViewFactory {
    pub fn new(mini_size: ViewSize, full_size: ViewSize) -> Self {
        Self {
            mini_size,
            full_size,
            next_id: AtomicUsize::new(0),
        }
    }
}

impl ViewFactory for PlotViewFactory {
    type View = PlotView;

    fn create(&self, kind: ViewKind, config: &VisualConfig) -> PlotView {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (prefix, size) = match kind {
            ViewKind::Mini => ("mini", self.mini_size),
            ViewKind::Full => ("full", self.full_size),
        };
        PlotView::new(format!("{}_plot_{}", prefix, n), kind, config.clone(), size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_is_stable() {
        assert_eq!(ColorPalette::color_for("r1_s"), ColorPalette::color_for("r1_s"));
        assert_eq!(
            ColorPalette::parse_hex("#ff8000"),
            Some(Color32::from_rgb(255, 128, 0))
        );
        assert_eq!(ColorPalette::parse_hex("red"), None);
    }

    #[test]
    fn test_series_points_skip_nan_and_min() {
        let s = Series::new("a", vec![1.0, f64::NAN, 3.0, 4.0]);
        assert_eq!(series_points(&s, None), vec![[0.0, 1.0], [2.0, 3.0], [3.0, 4.0]]);
        assert_eq!(series_points(&s, Some(3.0)), vec![[3.0, 4.0]]);
    }

    #[test]
    fn test_stack_key_separates_runs() {
        let config = VisualConfig {
            groups: vec![vec!["WHITE".to_string(), "OTHER".to_string()]],
            ..Default::default()
        };
        assert_eq!(stack_key(&config, "run1_WHITE"), Some(("run1".to_string(), 0)));
        assert_eq!(stack_key(&config, "run1_OTHER"), Some(("run1".to_string(), 0)));
        assert_eq!(stack_key(&config, "WHITE"), Some((String::new(), 0)));
        assert_ne!(stack_key(&config, "run1_WHITE"), stack_key(&config, "run2_WHITE"));
        assert_eq!(stack_key(&config, "run1_ASIAN"), None);
    }

    #[test]
    fn test_factory_gives_unique_plot_ids() {
        let factory = PlotViewFactory::new(ViewSize::new(100.0, 40.0), ViewSize::new(600.0, 450.0));
        let a = factory.create(ViewKind::Mini, &VisualConfig::default());
        let b = factory.create(ViewKind::Full, &VisualConfig::default());
        assert_ne!(a.plot_id, b.plot_id);
        assert_eq!(a.size(), ViewSize::new(100.0, 40.0));
        assert_eq!(b.kind(), ViewKind::Full);
    }
}
