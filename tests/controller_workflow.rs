//! End-to-end controller workflows over a stub transport
//!
//! Covers startup with and without runs, loading and unloading runs, stale
//! fetch results, retries after failures and render idempotence.

mod common;

use common::builders::{session_path, CatalogFixture, RunIndexBuilder};
use common::stub_transport::StubTransport;
use epicharts::config::MemoryStorage;
use epicharts::controller::{RunCompletion, StartOutcome, NO_RUNS_MESSAGE};
use epicharts::state::RunStatus;
use epicharts::view::ChartView;

const RUNS: &str = "api/runs.json";

fn single_chart_setup(payload: Option<&str>) -> (StubTransport, MemoryStorage) {
    let transport = StubTransport::new().with(RUNS, RunIndexBuilder::new().session("run1").body());
    if let Some(payload) = payload {
        transport.set(&session_path("run1"), payload);
    }
    (transport, MemoryStorage::new())
}

#[tokio::test]
async fn test_empty_run_index_shows_message_without_rendering() {
    let transport = StubTransport::new().with(RUNS, "[]");
    let storage = MemoryStorage::new();
    let mut controller = common::controller(CatalogFixture::new().chart("a").build(), &transport, &storage);

    let outcome = controller.start().await;

    assert_eq!(outcome, StartOutcome::NoRuns);
    assert_eq!(controller.display_model().message.as_deref(), Some(NO_RUNS_MESSAGE));
    assert_eq!(controller.display_model().renders, 0);
    assert_eq!(controller.factory().created(), 0);
    assert!(controller.views("a").is_none());
}

#[tokio::test]
async fn test_missing_run_index_reports_failure() {
    let transport = StubTransport::new();
    let storage = MemoryStorage::new();
    let mut controller = common::controller(CatalogFixture::new().chart("a").build(), &transport, &storage);

    let outcome = controller.start().await;

    assert!(matches!(outcome, StartOutcome::Failed(_)));
    let message = controller.display_model().message.clone().unwrap();
    assert!(message.starts_with("failed to load runs"), "{}", message);
    assert!(controller.last_error().is_some());
}

#[tokio::test]
async fn test_loaded_run_series_are_prefixed_in_both_views() {
    let (transport, storage) = single_chart_setup(Some(r#"{"chartX":[["s1",1,2]]}"#));
    let mut controller =
        common::controller(CatalogFixture::new().chart("chartX").chart("other").build(), &transport, &storage);

    assert_eq!(
        controller.start().await,
        StartOutcome::Displayed { restored: vec![] }
    );

    let request = controller.toggle_run("run1").unwrap().expect("run1 needs a fetch");
    assert_eq!(request.url, "api/session/run1.json");
    assert_eq!(controller.state().run("run1").unwrap().status, RunStatus::Loading);

    let result = controller.fetcher().fetch_json(&request.url).await;
    let completion = controller.complete_run_fetch(request, result);
    assert_eq!(completion, RunCompletion::Applied { series: 1 });

    let views = controller.views("chartX").unwrap();
    assert_eq!(views.mini.values("run1_s1"), Some(&[1.0, 2.0][..]));
    assert_eq!(views.full.values("run1_s1"), Some(&[1.0, 2.0][..]));
    assert!(views.mini.values("s1").is_none());

    // Charts absent from the payload still receive an (empty) load
    let other = controller.views("other").unwrap();
    assert!(other.full.series().is_empty());
    assert!(other.full.load_calls >= 1);

    let run = controller.state().run("run1").unwrap();
    assert_eq!(run.status, RunStatus::Loaded);
    assert!(run.run.loaded);
    assert!(controller.display_model().toggles.get("run1").unwrap().checked());
}

#[tokio::test]
async fn test_toggle_off_unloads_only_that_run() {
    let transport = StubTransport::new()
        .with(RUNS, RunIndexBuilder::new().session("run1").session("run2").body())
        .with(&session_path("run1"), r#"{"chartX":[["s1",1,2]]}"#)
        .with(&session_path("run2"), r#"{"chartX":[["s1",3,4]]}"#);
    let storage = MemoryStorage::new();
    let mut controller = common::controller(CatalogFixture::new().chart("chartX").build(), &transport, &storage);
    controller.start().await;

    controller.fetch_run_data("run1").await.unwrap();
    controller.fetch_run_data("run2").await.unwrap();
    assert_eq!(controller.views("chartX").unwrap().full.series().len(), 2);

    assert_eq!(controller.toggle_run("run1").unwrap(), None);

    let views = controller.views("chartX").unwrap();
    assert_eq!(views.mini.data_ids(), vec!["run2_s1".to_string()]);
    assert_eq!(views.full.data_ids(), vec!["run2_s1".to_string()]);
    assert_eq!(controller.state().run("run1").unwrap().status, RunStatus::Unloaded);
}

#[tokio::test]
async fn test_result_arriving_after_toggle_off_is_discarded() {
    let (transport, storage) = single_chart_setup(Some(r#"{"chartX":[["s1",1,2]]}"#));
    let mut controller = common::controller(CatalogFixture::new().chart("chartX").build(), &transport, &storage);
    controller.start().await;

    let request = controller.toggle_run("run1").unwrap().unwrap();
    assert_eq!(controller.toggle_run("run1").unwrap(), None);

    let result = controller.fetcher().fetch_json(&request.url).await;
    assert_eq!(controller.complete_run_fetch(request, result), RunCompletion::Stale);

    assert!(controller.views("chartX").unwrap().full.series().is_empty());
    assert_eq!(controller.state().run("run1").unwrap().status, RunStatus::Unloaded);
}

#[tokio::test]
async fn test_latest_toggle_wins_over_earlier_request() {
    let (transport, storage) = single_chart_setup(Some(r#"{"chartX":[["s1",1,2]]}"#));
    let mut controller = common::controller(CatalogFixture::new().chart("chartX").build(), &transport, &storage);
    controller.start().await;

    let first = controller.toggle_run("run1").unwrap().unwrap();
    controller.toggle_run("run1").unwrap();
    let second = controller.toggle_run("run1").unwrap().unwrap();
    assert!(second.generation > first.generation);

    let result = controller.fetcher().fetch_json(&first.url).await;
    assert_eq!(controller.complete_run_fetch(first, result.clone()), RunCompletion::Stale);
    assert_eq!(
        controller.complete_run_fetch(second, result),
        RunCompletion::Applied { series: 1 }
    );
}

#[tokio::test]
async fn test_failed_run_can_be_retried() {
    let (transport, storage) = single_chart_setup(None);
    let mut controller = common::controller(CatalogFixture::new().chart("chartX").build(), &transport, &storage);
    controller.start().await;

    let completion = controller.fetch_run_data("run1").await.unwrap();
    assert!(matches!(completion, RunCompletion::Failed(_)));
    assert!(matches!(
        controller.state().run("run1").unwrap().status,
        RunStatus::Failed(_)
    ));
    let block = controller.display_model().details.get("chartX").unwrap();
    assert_eq!(block.errors.len(), 1);
    assert_eq!(block.errors[0].0, "run1");

    transport.set(&session_path("run1"), r#"{"chartX":[["s1",5]]}"#);
    let request = controller.toggle_run("run1").unwrap().expect("failed run toggles back on");
    let result = controller.fetcher().fetch_json(&request.url).await;

    assert_eq!(
        controller.complete_run_fetch(request, result),
        RunCompletion::Applied { series: 1 }
    );
    assert_eq!(transport.requests(&session_path("run1")), 2);
    assert!(controller.display_model().details.get("chartX").unwrap().errors.is_empty());
}

#[tokio::test]
async fn test_wrongly_shaped_payload_can_be_retried() {
    let (transport, storage) = single_chart_setup(Some(r#"{"chartX":"nope"}"#));
    let mut controller = common::controller(CatalogFixture::new().chart("chartX").build(), &transport, &storage);
    controller.start().await;

    let completion = controller.fetch_run_data("run1").await.unwrap();
    assert!(matches!(completion, RunCompletion::Failed(_)));
    assert!(!controller.fetcher().is_cached(&session_path("run1")));

    transport.set(&session_path("run1"), r#"{"chartX":[["s1",1,2]]}"#);
    let request = controller.toggle_run("run1").unwrap().expect("failed run toggles back on");
    let result = controller.fetcher().fetch_json(&request.url).await;

    assert_eq!(
        controller.complete_run_fetch(request, result),
        RunCompletion::Applied { series: 1 }
    );
    assert_eq!(transport.requests(&session_path("run1")), 2);
    assert_eq!(
        controller.views("chartX").unwrap().full.values("run1_s1"),
        Some(&[1.0, 2.0][..])
    );
}

#[tokio::test]
async fn test_second_display_enters_nothing() {
    let (transport, storage) = single_chart_setup(Some(r#"{"a":[["s1",1]]}"#));
    let mut controller =
        common::controller(CatalogFixture::new().chart("a").chart("b").build(), &transport, &storage);
    controller.start().await;
    controller.fetch_run_data("run1").await.unwrap();

    controller.display();
    let renders = controller.display_model().renders;
    controller.display();
    let total = controller.display_model().last_report.total();

    assert_eq!(controller.display_model().renders, renders + 1);
    assert_eq!(total.entered, 0);
    assert_eq!(total.exited, 0);
    assert_eq!(controller.display_model().details.len(), 2);
    assert_eq!(controller.display_model().previews.len(), 2);
    assert_eq!(controller.display_model().toggles.len(), 1);
}

#[tokio::test]
async fn test_views_are_created_once_per_chart() {
    let (transport, storage) = single_chart_setup(Some(r#"{"a":[["s1",1]]}"#));
    let mut controller =
        common::controller(CatalogFixture::new().chart("a").chart("b").build(), &transport, &storage);
    controller.start().await;
    controller.fetch_run_data("run1").await.unwrap();
    controller.toggle_run("run1").unwrap();
    controller.display();

    // a mini and a full view per chart
    assert_eq!(controller.factory().created(), 4);
}

#[tokio::test]
async fn test_runs_persisted_as_loaded_are_restored() {
    let transport = StubTransport::new()
        .with(RUNS, RunIndexBuilder::new().session("run1").session("run2").body())
        .with(&session_path("run1"), r#"{"chartX":[["s1",1,2]]}"#);
    let storage = MemoryStorage::with_slot(
        "chartState-v1",
        r#"{"charts":[],"runs":[{"id":"run1","loaded":true},{"id":"run2","loaded":false}]}"#,
    );
    let mut controller = common::controller(CatalogFixture::new().chart("chartX").build(), &transport, &storage);

    let outcome = controller.start().await;

    assert_eq!(
        outcome,
        StartOutcome::Displayed {
            restored: vec![RunCompletion::Applied { series: 1 }]
        }
    );
    assert_eq!(controller.state().run("run1").unwrap().status, RunStatus::Loaded);
    assert_eq!(controller.state().run("run2").unwrap().status, RunStatus::Unloaded);
    assert_eq!(transport.requests(&session_path("run2")), 0);
}

#[tokio::test]
async fn test_run_closed_while_loading_is_restored() {
    let (transport, storage) = single_chart_setup(Some(r#"{"chartX":[["s1",1,2]]}"#));
    let catalog = || CatalogFixture::new().chart("chartX").build();
    let mut controller = common::controller(catalog(), &transport, &storage);
    controller.start().await;

    let request = controller.toggle_run("run1").unwrap();
    assert!(request.is_some());
    assert_eq!(controller.state().run("run1").unwrap().status, RunStatus::Loading);
    let saved: serde_json::Value = serde_json::from_str(&storage.get("chartState-v1").unwrap()).unwrap();
    assert_eq!(saved["runs"][0]["loaded"], true);
    drop(controller);

    let mut reopened = common::controller(catalog(), &transport, &storage);
    let outcome = reopened.start().await;

    assert_eq!(
        outcome,
        StartOutcome::Displayed {
            restored: vec![RunCompletion::Applied { series: 1 }]
        }
    );
    assert_eq!(reopened.state().run("run1").unwrap().status, RunStatus::Loaded);
}

#[tokio::test]
async fn test_stat_block_lists_allowed_fields_in_order() {
    let transport = StubTransport::new()
        .with(
            RUNS,
            RunIndexBuilder::new()
                .with_stats("run1", serde_json::json!({"seed": 42, "duration": 1.5, "total": 1000}))
                .body(),
        )
        .with(&session_path("run1"), "{}");
    let storage = MemoryStorage::new();
    let mut controller = common::controller(CatalogFixture::new().chart("a").build(), &transport, &storage);
    controller.start().await;
    assert!(controller.display_model().stats.is_empty());

    controller.fetch_run_data("run1").await.unwrap();

    let block = controller.display_model().stats.get("run1").unwrap();
    assert_eq!(
        block.fields,
        vec![
            ("seed".to_string(), "42".to_string()),
            ("duration".to_string(), "1.5".to_string())
        ]
    );
}

#[tokio::test]
async fn test_hidden_chart_survives_restart() {
    let (transport, storage) = single_chart_setup(None);
    let catalog = || CatalogFixture::new().chart("a").chart("b").build();

    let mut first = common::controller(catalog(), &transport, &storage);
    first.start().await;
    assert!(first.toggle_chart_disabled("b").unwrap());

    let mut second = common::controller(catalog(), &transport, &storage);
    second.start().await;
    assert!(second.state().chart("b").unwrap().disabled);
    assert!(!second.state().chart("a").unwrap().disabled);

    second.enable_chart("b").unwrap();
    assert!(!second.state().chart("b").unwrap().disabled);
    assert_eq!(second.take_scroll_target().as_deref(), Some("b"));
}
