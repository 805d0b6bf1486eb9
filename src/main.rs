//! epicharts - Main Entry Point
//!
//! `epicharts` (or `epicharts view`) opens the chart viewer, `epicharts compile`
//! builds run endpoints from CSV files and `epicharts catalog` lists the
//! built-in charts.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use epicharts::{
    builtin_catalog,
    compiler::{sources_by_file, RunCompiler},
    config::{self, AppConfig, DataSource, FileStorage, StateStore},
    controller::{ChartController, ControllerSettings},
    fetch::{DataFetcher, DirectoryTransport, HttpTransport, Transport},
    frontend::{ChartsApp, FetchBridge, PlotViewFactory},
    Run,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser)]
#[command(name = "epicharts")]
#[command(about = "Interactive epidemiological chart viewer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file path
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the chart viewer
    View {
        /// Data source: an http(s) URL or a directory holding `api/`
        #[arg(short, long, value_name = "URL|DIR")]
        source: Option<String>,

        /// Storage key of the persisted chart state
        #[arg(long, value_name = "KEY")]
        state_key: Option<String>,
    },
    /// Compile a run directory of CSV files into run endpoints
    Compile {
        /// Directory holding the run's CSV files
        #[arg(short, long, value_name = "RUN_DIR")]
        input: PathBuf,

        /// The `api` directory to write to
        #[arg(short, long, value_name = "API_DIR")]
        output: PathBuf,

        /// Run id
        #[arg(long)]
        id: String,

        /// Run label
        #[arg(long)]
        label: Option<String>,

        /// Run type
        #[arg(long = "type", default_value = epicharts::types::SESSION_RUN_TYPE)]
        kind: String,

        /// Run color, e.g. `#1f77b4`
        #[arg(long)]
        color: Option<String>,
    },
    /// Validate and list the built-in chart catalog
    Catalog,
}

fn init_logging() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,epicharts=debug"))
    };
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(filter());

    let file = config::app_data_dir().map(|dir| dir.join("logs")).and_then(|dir| {
        std::fs::create_dir_all(&dir).ok()?;
        Some(tracing_appender::rolling::daily(dir, "epicharts.log"))
    });

    match file {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            tracing_subscriber::registry()
                .with(stderr_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(stderr_layer).init();
            None
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging();

    let config = AppConfig::load_or_default(cli.config.as_deref());

    match cli.command {
        None => run_viewer(config, None, None),
        Some(Commands::View { source, state_key }) => run_viewer(config, source, state_key),
        Some(Commands::Compile {
            input,
            output,
            id,
            label,
            kind,
            color,
        }) => {
            let mut run = Run::new(id).with_kind(kind);
            run.label = label;
            run.color = color;
            compile(&input, &output, run)
        }
        Some(Commands::Catalog) => list_catalog(),
    }
}

fn run_viewer(
    mut config: AppConfig,
    source: Option<String>,
    state_key: Option<String>,
) -> Result<()> {
    if let Some(source) = source {
        config.source = DataSource::parse(&source);
    }
    if let Some(key) = state_key {
        config.state_key = key;
    }

    tracing::info!("Starting epicharts viewer, data source {}", config.source);

    let transport: Arc<dyn Transport> = match &config.source {
        DataSource::Url(url) => Arc::new(HttpTransport::new(url)?),
        DataSource::Directory(dir) => Arc::new(DirectoryTransport::new(dir.clone())),
    };
    let fetcher = Arc::new(DataFetcher::new(transport));

    let state_dir = config.state_dir()?;
    let store = StateStore::with_key(FileStorage::new(state_dir), config.state_key.clone());
    let factory = PlotViewFactory::new(config.mini_size, config.full_size);
    let controller = ChartController::new(
        builtin_catalog()?,
        store,
        Arc::clone(&fetcher),
        factory,
        ControllerSettings::from(&config),
    );
    let bridge = FetchBridge::new(fetcher).context("Failed to start fetch runtime")?;

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1280.0, 800.0])
            .with_min_inner_size([800.0, 600.0])
            .with_title("epicharts"),
        ..Default::default()
    };

    let result = eframe::run_native(
        "epicharts",
        native_options,
        Box::new(|cc| {
            cc.egui_ctx.set_visuals(egui::Visuals::light());
            Ok(Box::new(ChartsApp::new(cc, controller, bridge)))
        }),
    );

    tracing::info!("Shutting down...");
    result.map_err(|e| anyhow::anyhow!("Viewer failed: {}", e))
}

fn compile(input: &std::path::Path, output: &std::path::Path, run: Run) -> Result<()> {
    let catalog = builtin_catalog()?;
    let report = RunCompiler::new(&catalog)
        .compile(input, output, run)
        .with_context(|| format!("Failed to compile {}", input.display()))?;

    println!(
        "Wrote {} charts to {}",
        report.charts.len(),
        report.payload_path.display()
    );
    if !report.skipped.is_empty() {
        println!("Skipped (missing source): {}", report.skipped.join(", "));
    }
    Ok(())
}

fn list_catalog() -> Result<()> {
    let catalog = builtin_catalog()?;
    println!("{} charts", catalog.len());
    for chart in catalog.charts() {
        let adjust = chart.adjust.as_deref().unwrap_or("-");
        println!("  {:<30} {:<28} adjust={}", chart.id, chart.source, adjust);
    }
    if !catalog.declared_disabled().is_empty() {
        println!("Disabled in catalog: {}", catalog.declared_disabled().join(", "));
    }
    println!("Run inputs:");
    for (source, charts) in sources_by_file(&catalog) {
        println!("  {:<28} {}", source, charts.join(", "));
    }
    Ok(())
}
