//! Deduplicating JSON fetcher
//!
//! [`DataFetcher`] caches one shared future per URL. The future is stored
//! before it is first polled, so every caller asking for the same URL (even
//! while the first request is still in flight) awaits the same request and
//! receives a clone of the same `Arc<Value>`.
//!
//! Successful results stay cached for the lifetime of the fetcher. Failed
//! results are evicted once they resolve so that a later attempt issues a
//! fresh request.

pub mod transport;

pub use transport::{DirectoryTransport, HttpTransport, Transport};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::Value;
use thiserror::Error;

/// Errors produced while fetching an endpoint
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    #[error("request for {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("{url} not found")]
    NotFound { url: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("{url} is not valid JSON: {message}")]
    Decode { url: String, message: String },
}

/// Result of a cached fetch
pub type FetchResult = Result<Arc<Value>, FetchError>;

type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

struct CacheEntry {
    id: u64,
    future: SharedFetch,
}

/// JSON fetcher with a per-URL request cache
pub struct DataFetcher {
    transport: Arc<dyn Transport>,
    cache: Mutex<HashMap<String, CacheEntry>>,
    next_id: AtomicU64,
}

impl DataFetcher {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            cache: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
        }
    }

    /// Where the fetcher reads from
    pub fn describe(&self) -> String {
        self.transport.describe()
    }

    fn lock_cache(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.cache.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fetch and decode a JSON endpoint, sharing in-flight requests
    pub async fn fetch_json(&self, url: &str) -> FetchResult {
        let (id, future) = {
            let mut cache = self.lock_cache();
            match cache.get(url) {
                Some(entry) => {
                    tracing::trace!("Fetch cache hit for {}", url);
                    (entry.id, entry.future.clone())
                }
                None => {
                    tracing::debug!("Fetching {} from {}", url, self.transport.describe());
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let future = request(Arc::clone(&self.transport), url.to_string())
                        .boxed()
                        .shared();
                    cache.insert(
                        url.to_string(),
                        CacheEntry {
                            id,
                            future: future.clone(),
                        },
                    );
                    (id, future)
                }
            }
        };

        let result = future.await;
        if let Err(e) = &result {
            let mut cache = self.lock_cache();
            if cache.get(url).map(|entry| entry.id) == Some(id) {
                tracing::warn!("Fetching {} failed, dropping cached request: {}", url, e);
                cache.remove(url);
            }
        }
        result
    }

    /// Whether a URL has a cached (pending or completed) request
    pub fn is_cached(&self, url: &str) -> bool {
        self.lock_cache().contains_key(url)
    }

    /// Drop the cached request for a URL so the next fetch hits the transport.
    ///
    /// Used when a body decoded as JSON but not into the shape the caller
    /// expected.
    pub fn invalidate(&self, url: &str) -> bool {
        let removed = self.lock_cache().remove(url).is_some();
        if removed {
            tracing::debug!("Invalidated cached request for {}", url);
        }
        removed
    }

    /// Number of cached URLs
    pub fn cached_len(&self) -> usize {
        self.lock_cache().len()
    }
}

async fn request(transport: Arc<dyn Transport>, url: String) -> FetchResult {
    let body = transport.get(&url).await?;
    let value: Value = serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
        url: url.clone(),
        message: e.to_string(),
    })?;
    Ok(Arc::new(value))
}
