//! In-memory transport with request counting and an optional gate

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use epicharts::fetch::{FetchError, Transport};
use tokio::sync::Notify;

#[derive(Default)]
struct Inner {
    bodies: Mutex<HashMap<String, Vec<u8>>>,
    counts: Mutex<HashMap<String, usize>>,
    total: AtomicUsize,
    gate: Option<Notify>,
}

/// Serves fixed bodies by path; unknown paths are `NotFound`
#[derive(Clone, Default)]
pub struct StubTransport {
    inner: Arc<Inner>,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every request waits for [`StubTransport::release`] before answering
    pub fn gated() -> Self {
        Self {
            inner: Arc::new(Inner {
                gate: Some(Notify::new()),
                ..Default::default()
            }),
        }
    }

    pub fn with(self, path: &str, body: impl Into<String>) -> Self {
        self.set(path, body);
        self
    }

    pub fn set(&self, path: &str, body: impl Into<String>) {
        self.inner
            .bodies
            .lock()
            .unwrap()
            .insert(path.to_string(), body.into().into_bytes());
    }

    pub fn remove(&self, path: &str) {
        self.inner.bodies.lock().unwrap().remove(path);
    }

    /// Let one waiting (or the next) request through
    pub fn release(&self) {
        if let Some(gate) = &self.inner.gate {
            gate.notify_one();
        }
    }

    /// Requests issued for a path
    pub fn requests(&self, path: &str) -> usize {
        self.inner
            .counts
            .lock()
            .unwrap()
            .get(path)
            .copied()
            .unwrap_or(0)
    }

    /// Requests issued in total
    pub fn total_requests(&self) -> usize {
        self.inner.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for StubTransport {
    async fn get(&self, path: &str) -> Result<Vec<u8>, FetchError> {
        self.inner.total.fetch_add(1, Ordering::SeqCst);
        *self
            .inner
            .counts
            .lock()
            .unwrap()
            .entry(path.to_string())
            .or_insert(0) += 1;

        if let Some(gate) = &self.inner.gate {
            gate.notified().await;
        }

        self.inner
            .bodies
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                url: path.to_string(),
            })
    }

    fn describe(&self) -> String {
        "stub".to_string()
    }
}
