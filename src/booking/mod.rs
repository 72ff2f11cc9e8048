//! Timed acquisition engine
//!
//! This module wires the acquisition pipeline together:
//!
//! - [`endpoint`] - discovers and caches the accepted booking endpoint
//! - [`dispatcher`] - one booking attempt with retry and backoff
//! - [`classify`] - pure reply classification
//! - [`burst`] - concurrent burst of attempts reduced to one verdict
//!
//! [`AcquisitionEngine`] composes them with the [`OpenWaiter`]: resolve the
//! endpoint early, wait for the open instant, fire.

pub mod burst;
pub mod classify;
pub mod dispatcher;
pub mod endpoint;

use std::sync::Arc;

use crate::client::Session;
use crate::config::Config;
use crate::models::Resource;
use crate::scheduler::{OpenWaiter, WaitOutcome};

pub use burst::{BurstCoordinator, BurstVerdict};
pub use classify::{classify, Classification, HttpReply};
pub use dispatcher::{AttemptOutcome, OutcomeKind, RequestDispatcher};
pub use endpoint::{EndpointCache, EndpointResolver, ResolvedEndpoint};

/// Resolver, waiter and burst coordinator sharing one endpoint cache
pub struct AcquisitionEngine {
    cache: EndpointCache,
    waiter: OpenWaiter,
    coordinator: BurstCoordinator,
}

impl AcquisitionEngine {
    pub fn new(cache: EndpointCache, waiter: OpenWaiter, coordinator: BurstCoordinator) -> Self {
        Self {
            cache,
            waiter,
            coordinator,
        }
    }

    /// Build the whole pipeline around an authenticated session
    pub fn from_config(config: &Config, session: Arc<Session>) -> Self {
        let cache = EndpointCache::new();
        let resolver = EndpointResolver::from_config(Arc::clone(&session), config, cache.clone());
        let dispatcher = RequestDispatcher::new(
            session,
            config.burst.retry.clone(),
            config.site.payload_encoding,
            config.site.list_endpoint.clone(),
        );
        let coordinator = BurstCoordinator::new(
            resolver,
            dispatcher,
            config.burst.parallel_shots,
            config.burst.startup_jitter_ms,
        );

        Self::new(cache, OpenWaiter::from_config(config), coordinator)
    }

    pub fn cache(&self) -> &EndpointCache {
        &self.cache
    }

    /// Resolve the booking endpoint ahead of the open instant
    pub async fn prepare(&self, resource: &Resource) -> ResolvedEndpoint {
        self.coordinator.resolver().resolve(resource).await
    }

    /// Prepare, wait for the open instant, then fire one burst
    pub async fn run(&self, resource: &Resource) -> BurstVerdict {
        if !resource.is_booked() {
            let endpoint = self.prepare(resource).await;
            tracing::info!(endpoint = %endpoint, "Endpoint ready");
        }

        match self.waiter.wait_until_open(resource.open_instant()).await {
            WaitOutcome::Unscheduled => {
                tracing::warn!(
                    resource = %resource.id,
                    "No reservation start published, firing now"
                );
            }
            WaitOutcome::AlreadyOpen => {
                tracing::info!(resource = %resource.id, "Reservation already open, firing now");
            }
            WaitOutcome::Opened { overshoot } => {
                tracing::info!(
                    resource = %resource.id,
                    overshoot_ms = overshoot.as_millis() as u64,
                    "Reservation open"
                );
            }
        }

        self.coordinator.fire(resource).await
    }
}
