//! Request sharing in the data fetcher

mod common;

use std::sync::Arc;

use common::stub_transport::StubTransport;
use epicharts::fetch::{DataFetcher, FetchError};

const URL: &str = "api/session/run1.json";

#[tokio::test]
async fn test_concurrent_fetches_share_one_request() {
    let transport = StubTransport::gated().with(URL, r#"{"chartX":[["s1",1,2]]}"#);
    let fetcher = DataFetcher::new(Arc::new(transport.clone()));

    let fetches = futures::future::join_all((0..5).map(|_| fetcher.fetch_json(URL)));
    let release = async {
        tokio::task::yield_now().await;
        transport.release();
    };
    let (results, ()) = tokio::join!(fetches, release);

    assert_eq!(transport.requests(URL), 1);
    let values: Vec<_> = results.into_iter().map(Result::unwrap).collect();
    for value in &values[1..] {
        assert!(Arc::ptr_eq(&values[0], value));
    }
    assert_eq!(values[0]["chartX"][0][0], "s1");
}

#[tokio::test]
async fn test_completed_fetch_is_served_from_cache() {
    let transport = StubTransport::new().with(URL, "[1, 2]");
    let fetcher = DataFetcher::new(Arc::new(transport.clone()));

    let first = fetcher.fetch_json(URL).await.unwrap();
    transport.remove(URL);
    let second = fetcher.fetch_json(URL).await.unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(transport.total_requests(), 1);
}

#[tokio::test]
async fn test_failure_is_not_cached() {
    let transport = StubTransport::new();
    let fetcher = DataFetcher::new(Arc::new(transport.clone()));

    let error = fetcher.fetch_json(URL).await.unwrap_err();
    assert_eq!(error, FetchError::NotFound { url: URL.to_string() });
    assert!(!fetcher.is_cached(URL));

    transport.set(URL, "{}");
    assert!(fetcher.fetch_json(URL).await.is_ok());
    assert_eq!(transport.requests(URL), 2);
    assert_eq!(fetcher.cached_len(), 1);
}

#[tokio::test]
async fn test_invalid_json_is_a_decode_error() {
    let transport = StubTransport::new().with(URL, "<html>");
    let fetcher = DataFetcher::new(Arc::new(transport));

    let error = fetcher.fetch_json(URL).await.unwrap_err();

    assert!(matches!(error, FetchError::Decode { .. }));
}
