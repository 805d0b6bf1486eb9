//! # epicharts: Epidemiological Chart Viewer
//!
//! Renders interactive charts (cancer incidence, mortality, screening,
//! survival) from per-run datasets, lets the user toggle which runs are loaded
//! and remembers what was shown between sessions.
//!
//! ## Architecture
//!
//! - **Catalog**: static chart descriptors with their preprocessing functions
//! - **Compiler**: turns a run's CSV files into the JSON endpoints the viewer reads
//! - **Fetch**: deduplicating JSON fetcher over HTTP or a local directory
//! - **Controller**: merges saved state, loads runs into paired mini/full views,
//!   persists and re-renders after every change
//! - **Frontend**: eframe/egui viewer with egui_plot charts
//! - **Communication**: fetches run on tokio, results cross to the UI thread
//!   over crossbeam channels
//!
//! ## Configuration
//!
//! Viewer settings and the persisted chart state live in the platform data
//! directory under `dev.epicharts.viewer`:
//!
//! - **Linux**: `~/.local/share/dev.epicharts.viewer/`
//! - **macOS**: `~/Library/Application Support/dev.epicharts.viewer/`
//! - **Windows**: `%APPDATA%\dev.epicharts.viewer\`
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use epicharts::{
//!     catalog::builtin_catalog,
//!     config::{MemoryStorage, StateStore},
//!     controller::{ChartController, ControllerSettings},
//!     fetch::{DataFetcher, DirectoryTransport},
//!     view::MemoryViewFactory,
//! };
//!
//! let fetcher = Arc::new(DataFetcher::new(Arc::new(DirectoryTransport::new("./out"))));
//! let mut controller = ChartController::new(
//!     builtin_catalog()?,
//!     StateStore::new(MemoryStorage::new()),
//!     fetcher,
//!     MemoryViewFactory::new(),
//!     ControllerSettings::default(),
//! );
//! controller.start().await;
//! controller.fetch_run_data("run1").await?;
//! ```

pub mod catalog;
pub mod compiler;
pub mod config;
pub mod controller;
pub mod error;
pub mod fetch;
pub mod frontend;
pub mod render;
pub mod state;
pub mod stats;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use catalog::{builtin_catalog, Catalog, CatalogBuilder, ChartDescriptor, ChartDraft};
pub use config::{AppConfig, DataSource, StateStore};
pub use controller::{ChartController, ControllerSettings, RunCompletion, RunRequest};
pub use error::{ChartsError, Result};
pub use fetch::{DataFetcher, FetchError};
pub use frontend::ChartsApp;
pub use types::{Run, Series, SeriesTable};
