//! Concurrent burst of acquisition attempts
//!
//! At the open instant the coordinator launches a fixed number of
//! [`RequestDispatcher::attempt`] futures against the same resource, each
//! staggered by a few milliseconds, and waits for every one of them to
//! settle. Nothing is cancelled on an early success.

use futures::future::join_all;
use rand::Rng;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::booking::dispatcher::{AttemptOutcome, RequestDispatcher};
use crate::booking::endpoint::{EndpointResolver, ResolvedEndpoint};
use crate::models::Resource;

/// Reduced result of one burst
#[derive(Debug, Clone)]
pub struct BurstVerdict {
    pub burst_id: Uuid,

    /// At least one attempt succeeded, or the burst was skipped
    pub success: bool,

    /// The resource already carried a booking; nothing was sent
    pub skipped: bool,

    /// Endpoint every attempt went through
    pub endpoint: Option<ResolvedEndpoint>,

    /// One entry per attempt, in launch order
    pub outcomes: Vec<AttemptOutcome>,
}

impl BurstVerdict {
    fn skipped(burst_id: Uuid) -> Self {
        Self {
            burst_id,
            success: true,
            skipped: true,
            endpoint: None,
            outcomes: Vec::new(),
        }
    }

    /// Number of successful attempts
    pub fn successes(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Whether any success was backed by a positive marker
    pub fn confirmed(&self) -> bool {
        self.outcomes.iter().any(|o| o.is_success() && o.confirmed)
    }
}

/// Fires bursts of concurrent attempts
pub struct BurstCoordinator {
    resolver: EndpointResolver,
    dispatcher: RequestDispatcher,

    /// Attempts per burst
    shots: usize,

    /// Upper bound (exclusive) of the random startup delay per attempt
    startup_jitter_ms: u64,
}

impl BurstCoordinator {
    pub fn new(
        resolver: EndpointResolver,
        dispatcher: RequestDispatcher,
        shots: usize,
        startup_jitter_ms: u64,
    ) -> Self {
        Self {
            resolver,
            dispatcher,
            shots: shots.max(1),
            startup_jitter_ms,
        }
    }

    pub fn resolver(&self) -> &EndpointResolver {
        &self.resolver
    }

    pub fn shots(&self) -> usize {
        self.shots
    }

    /// Startup delays, one per attempt: `rand(0..jitter) + index` ms
    fn startup_delays(&self) -> Vec<Duration> {
        let mut rng = rand::thread_rng();
        (0..self.shots)
            .map(|index| {
                let jitter = if self.startup_jitter_ms == 0 {
                    0
                } else {
                    rng.gen_range(0..self.startup_jitter_ms)
                };
                Duration::from_millis(jitter + index as u64)
            })
            .collect()
    }

    /// Fire one burst at `resource`
    ///
    /// The endpoint is resolved first (a cache hit when it was prepared
    /// ahead of time). The verdict is a success when any attempt succeeds.
    pub async fn fire(&self, resource: &Resource) -> BurstVerdict {
        let burst_id = Uuid::new_v4();
        let span = tracing::info_span!("burst", %burst_id, resource = %resource.id);

        async move {
            if let Some(booking_id) = &resource.booking_id {
                tracing::info!(%booking_id, "Already booked, skipping burst");
                return BurstVerdict::skipped(burst_id);
            }

            let endpoint = self.resolver.resolve(resource).await;
            tracing::info!(shots = self.shots, endpoint = %endpoint, "Firing burst");

            let attempts = self
                .startup_delays()
                .into_iter()
                .enumerate()
                .map(|(index, delay)| {
                    let endpoint = &endpoint;
                    async move {
                        tokio::time::sleep(delay).await;
                        tracing::debug!(
                            shot = index + 1,
                            delay_ms = delay.as_millis() as u64,
                            "Shot away"
                        );
                        self.dispatcher.attempt(resource, endpoint).await
                    }
                });

            let outcomes = join_all(attempts).await;
            let success = outcomes.iter().any(AttemptOutcome::is_success);

            for (index, outcome) in outcomes.iter().enumerate() {
                tracing::debug!(shot = index + 1, outcome = %outcome, "Shot settled");
            }

            if success {
                tracing::info!(
                    successes = outcomes.iter().filter(|o| o.is_success()).count(),
                    "Burst succeeded"
                );
            } else {
                tracing::error!(attempts = outcomes.len(), "Burst failed, no attempt succeeded");
            }

            BurstVerdict {
                burst_id,
                success,
                skipped: false,
                endpoint: Some(endpoint),
                outcomes,
            }
        }
        .instrument(span)
        .await
    }
}
