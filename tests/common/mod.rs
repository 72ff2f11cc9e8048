//! Common test utilities

use std::sync::Arc;
use std::time::Duration;

use burstbook::booking::endpoint::{
    EndpointCandidate, PayloadEncoding, PayloadShape, ResolverSettings,
};
use burstbook::client::Session;
use burstbook::utils::retry::RetryConfig;

#[allow(dead_code)]
pub const LIST_PATH: &str = "/alumni/presuniv_events";

/// Route-rejection markers used by the backend
#[allow(dead_code)]
pub fn markers() -> Vec<String> {
    vec![
        "unknown AJAX route".to_string(),
        "no handler for this route".to_string(),
        "404".to_string(),
    ]
}

/// Session against a mock server with a short request timeout
pub fn session(uri: &str, timeout_ms: u64) -> Arc<Session> {
    Arc::new(Session::new(uri, "burstbook-test", Duration::from_millis(timeout_ms)).unwrap())
}

/// Resolver settings probing `paths` with the default shapes
#[allow(dead_code)]
pub fn settings(paths: &[&str]) -> ResolverSettings {
    ResolverSettings {
        candidates: paths
            .iter()
            .map(|path| EndpointCandidate::new(*path, PayloadShape::defaults()))
            .collect(),
        fallback_path: LIST_PATH.to_string(),
        rejection_markers: markers(),
        encoding: PayloadEncoding::Form,
        referer_path: LIST_PATH.to_string(),
        probes_per_second: 1_000,
    }
}

/// Retry policy with millisecond delays
#[allow(dead_code)]
pub fn fast_retry(max_retries: u32) -> RetryConfig {
    RetryConfig::with_delays(max_retries, 1, 5, 0)
}
