//! Thread boundary between the fetch runtime and the UI.
//!
//! Fetches run as tasks on a background multi-threaded tokio runtime. Each
//! finished fetch is posted back as a [`FetchEvent`] over a crossbeam channel;
//! the UI thread drains the channel once per frame and hands the results to
//! the controller, which is only ever touched from the UI thread.

use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::controller::RunRequest;
use crate::fetch::{DataFetcher, FetchResult};

/// Messages sent from fetch tasks to the UI thread.
#[derive(Debug, Clone)]
pub enum FetchEvent {
    /// The run index finished loading.
    RunsIndex(FetchResult),
    /// A run payload finished loading.
    RunData(RunRequest, FetchResult),
}

/// Worker threads of the fetch runtime.
const FETCH_WORKER_THREADS: usize = 2;

/// UI-side handle for starting fetches and collecting their results.
pub struct FetchBridge {
    runtime: tokio::runtime::Runtime,
    fetcher: Arc<DataFetcher>,
    event_tx: Sender<FetchEvent>,
    event_rx: Receiver<FetchEvent>,
    repaint: Option<egui::Context>,
}

impl FetchBridge {
    /// Start the fetch runtime.
    pub fn new(fetcher: Arc<DataFetcher>) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(FETCH_WORKER_THREADS)
            .thread_name("epicharts-fetch")
            .enable_all()
            .build()?;
        let (event_tx, event_rx) = unbounded();
        Ok(Self {
            runtime,
            fetcher,
            event_tx,
            event_rx,
            repaint: None,
        })
    }

    /// Wake the UI whenever an event is posted.
    pub fn set_repaint(&mut self, ctx: egui::Context) {
        self.repaint = Some(ctx);
    }

    fn spawn<F>(&self, url: String, into_event: F)
    where
        F: FnOnce(FetchResult) -> FetchEvent + Send + 'static,
    {
        let fetcher = Arc::clone(&self.fetcher);
        let event_tx = self.event_tx.clone();
        let repaint = self.repaint.clone();
        self.runtime.spawn(async move {
            let result = fetcher.fetch_json(&url).await;
            if event_tx.send(into_event(result)).is_err() {
                tracing::debug!("UI gone, dropping result for {}", url);
                return;
            }
            if let Some(ctx) = repaint {
                ctx.request_repaint();
            }
        });
    }

    /// Fetch the run index.
    pub fn fetch_runs(&self, url: &str) {
        self.spawn(url.to_string(), FetchEvent::RunsIndex);
    }

    /// Fetch a run payload.
    pub fn fetch_run(&self, request: RunRequest) {
        let url = request.url.clone();
        self.spawn(url, move |result| FetchEvent::RunData(request, result));
    }

    /// Drain all pending events.
    pub fn drain(&self) -> Vec<FetchEvent> {
        self.event_rx.try_iter().collect()
    }

    /// Wait for the next event.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<FetchEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }
}
