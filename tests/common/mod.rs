//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
pub mod stub_transport;

use std::sync::Arc;

use epicharts::config::{MemoryStorage, StateStore};
use epicharts::controller::{ChartController, ControllerSettings};
use epicharts::fetch::DataFetcher;
use epicharts::view::MemoryViewFactory;
use epicharts::Catalog;

use stub_transport::StubTransport;

/// Controller over a stub transport, in-memory storage and headless views
pub fn controller(
    catalog: Catalog,
    transport: &StubTransport,
    storage: &MemoryStorage,
) -> ChartController<MemoryViewFactory> {
    ChartController::new(
        catalog,
        StateStore::new(storage.clone()),
        Arc::new(DataFetcher::new(Arc::new(transport.clone()))),
        MemoryViewFactory::new(),
        ControllerSettings::default(),
    )
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
