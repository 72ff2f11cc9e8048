//! Integration tests for the burst coordinator and the acquisition engine

mod common;

use burstbook::booking::endpoint::{EndpointCache, EndpointResolver, PayloadEncoding};
use burstbook::booking::{
    AcquisitionEngine, BurstCoordinator, OutcomeKind, RequestDispatcher, ResolvedEndpoint,
};
use burstbook::client::Session;
use burstbook::config::Config;
use burstbook::models::Resource;
use chrono::Utc;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{fast_retry, session, settings, LIST_PATH};

fn coordinator(session: Arc<Session>, cache: EndpointCache, shots: usize) -> BurstCoordinator {
    let resolver = EndpointResolver::new(Arc::clone(&session), settings(&["/book"]), cache);
    let dispatcher =
        RequestDispatcher::new(session, fast_retry(2), PayloadEncoding::Form, LIST_PATH);
    BurstCoordinator::new(resolver, dispatcher, shots, 5)
}

fn pinned(path: &str) -> EndpointCache {
    let cache = EndpointCache::new();
    cache.preset(ResolvedEndpoint::fallback(path));
    cache
}

/// Exactly one of four attempts succeeds: the burst succeeds with all outcomes
#[tokio::test]
async fn test_one_success_is_enough() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/book"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":true}"#))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/book"))
        .respond_with(ResponseTemplate::new(409).set_body_string(r#"{"error":true}"#))
        .expect(3)
        .mount(&mock_server)
        .await;

    let coordinator = coordinator(session(&mock_server.uri(), 2_000), pinned("/book"), 4);
    let verdict = coordinator.fire(&Resource::new("42", "PREUNI Gala")).await;

    assert!(verdict.success);
    assert!(!verdict.skipped);
    assert_eq!(verdict.outcomes.len(), 4);
    assert_eq!(verdict.successes(), 1);
    assert!(verdict.confirmed());
    assert_eq!(
        verdict
            .outcomes
            .iter()
            .filter(|o| o.kind == OutcomeKind::FatalFailure)
            .count(),
        3
    );
}

/// No success at all: a failed verdict carrying every outcome
#[tokio::test]
async fn test_all_attempts_fail() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("Forbidden"))
        .expect(4)
        .mount(&mock_server)
        .await;

    let coordinator = coordinator(session(&mock_server.uri(), 2_000), pinned("/book"), 4);
    let verdict = coordinator.fire(&Resource::new("42", "PREUNI Gala")).await;

    assert!(!verdict.success);
    assert_eq!(verdict.outcomes.len(), 4);
    assert!(verdict.outcomes.iter().all(|o| o.status == Some(403)));
}

/// An existing booking skips the burst without traffic
#[tokio::test]
async fn test_booked_resource_is_skipped() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(0)
        .mount(&mock_server)
        .await;

    let coordinator = coordinator(session(&mock_server.uri(), 2_000), EndpointCache::new(), 4);
    let resource = Resource::new("42", "PREUNI Gala").with_booking("777");
    let verdict = coordinator.fire(&resource).await;

    assert!(verdict.success);
    assert!(verdict.skipped);
    assert!(verdict.outcomes.is_empty());
    assert!(verdict.endpoint.is_none());
}

/// Without a prepared endpoint the burst resolves first, once
#[tokio::test]
async fn test_fire_resolves_once() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/book"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":true}"#))
        .expect(1 + 3)
        .mount(&mock_server)
        .await;

    let cache = EndpointCache::new();
    let coordinator = coordinator(session(&mock_server.uri(), 2_000), cache.clone(), 3);
    let verdict = coordinator.fire(&Resource::new("42", "PREUNI Gala")).await;

    assert!(verdict.success);
    assert_eq!(verdict.successes(), 3);
    assert!(cache.is_resolved());
    assert_eq!(verdict.endpoint.as_ref().map(|e| e.path.as_str()), Some("/book"));
}

/// The engine waits for the open instant, then fires
#[tokio::test]
async fn test_engine_fires_after_open() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(LIST_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"success":true}"#))
        .expect(1 + 4)
        .mount(&mock_server)
        .await;

    let mut config = Config::default();
    config.site.base_url = mock_server.uri();
    config.burst.retry = fast_retry(1);

    let engine = AcquisitionEngine::from_config(&config, session(&mock_server.uri(), 2_000));
    let open_at = Utc::now() + chrono::Duration::milliseconds(400);
    let resource = Resource::new("42", "PREUNI Gala")
        .with_quota(100, 5)
        .with_reservation_start(open_at);

    let verdict = engine.run(&resource).await;

    assert!(Utc::now() >= open_at);
    assert!(verdict.success);
    assert_eq!(verdict.outcomes.len(), 4);
    assert!(engine.cache().is_resolved());
}
