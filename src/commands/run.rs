use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::booking::{AcquisitionEngine, BurstVerdict};
use crate::client::list::{EventLister, ResourceSource};
use crate::config::{Config, Credentials};
use crate::error::{BurstbookErrorTrait, Error};
use crate::models::Resource;
use crate::selector::ResourceSelector;

/// Log in, wait for a matching event, then fire one burst at it
pub async fn run(config: Config, credentials: Credentials) -> Result<()> {
    let session = super::login(&config, &credentials)
        .await
        .context("Login failed")?;

    let lister = EventLister::new(Arc::clone(&session), config.site.list_endpoint.clone());
    let selector = ResourceSelector::from_config(&config);
    let engine = AcquisitionEngine::from_config(&config, session);

    println!("Searching for events matching {:?}", selector.keywords());

    let target = tokio::select! {
        target = wait_for_target(
            &lister,
            &selector,
            config.search_interval(),
            config.error_interval(),
        ) => target.context("Search aborted")?,
        _ = tokio::signal::ctrl_c() => {
            println!("Interrupted");
            return Ok(());
        }
    };

    print_target(&target);

    let verdict = engine.run(&target).await;
    report(&verdict);

    Ok(())
}

/// Poll `source` until a keyword-matching resource shows up and pick one
///
/// Waits `search_interval` after a listing without targets and
/// `error_interval` after any listing failure.
pub async fn wait_for_target(
    source: &dyn ResourceSource,
    selector: &ResourceSelector,
    search_interval: Duration,
    error_interval: Duration,
) -> crate::error::Result<Resource> {
    let mut attempt = 0_u64;

    loop {
        attempt += 1;
        tracing::info!(attempt, "Searching for events");

        let resources = match source.list().await {
            Ok(resources) => resources,
            Err(e) => {
                let error = Error::from(e);
                tracing::warn!(
                    attempt,
                    error = %error,
                    category = error.category().as_str(),
                    recoverable = error.is_recoverable(),
                    retry_in_secs = error_interval.as_secs(),
                    "Listing failed"
                );
                tokio::time::sleep(error_interval).await;
                continue;
            }
        };

        tracing::info!(attempt, count = resources.len(), "Events listed");
        for resource in &resources {
            let marker = if selector.is_target(resource) { "*" } else { " " };
            tracing::debug!("{marker} {resource}");
        }

        if resources.iter().any(|r| selector.is_target(r)) {
            let target = selector.pick(&resources, Utc::now())?;
            tracing::info!(attempt, target = %target, "Target found");
            return Ok(target.clone());
        }

        tracing::info!(
            attempt,
            retry_in_secs = search_interval.as_secs(),
            "No matching event yet"
        );
        tokio::time::sleep(search_interval).await;
    }
}

fn print_target(target: &Resource) {
    println!("\nTarget");
    println!("======");
    println!("  ID:          {}", target.id);
    println!("  Name:        {}", target.name);
    println!(
        "  Opens:       {} WIB",
        target.reservation_start_raw.as_deref().unwrap_or("-")
    );
    println!(
        "  Closes:      {} WIB",
        target.reservation_end_raw.as_deref().unwrap_or("-")
    );
    println!(
        "  Remaining:   {}",
        target
            .remaining_quota
            .map_or_else(|| "-".to_string(), |q| q.to_string())
    );
    println!("  Place:       {}", target.place.as_deref().unwrap_or("-"));
}

fn report(verdict: &BurstVerdict) {
    println!("\nBurst {}", verdict.burst_id);
    if verdict.skipped {
        println!("  Already booked, nothing sent");
        return;
    }

    if let Some(endpoint) = &verdict.endpoint {
        println!("  Endpoint: {endpoint}");
    }
    for (index, outcome) in verdict.outcomes.iter().enumerate() {
        println!("  #{} {outcome}", index + 1);
    }

    if verdict.success && verdict.confirmed() {
        println!(
            "Booking succeeded ({} of {} attempts)",
            verdict.successes(),
            verdict.outcomes.len()
        );
    } else if verdict.success {
        println!("Booking probably succeeded (2xx without confirmation); check the site");
    } else {
        println!("Booking failed; see the attempts above");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::error::ListError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedSource {
        replies: Mutex<VecDeque<std::result::Result<Vec<Resource>, ListError>>>,
    }

    impl ScriptedSource {
        fn new(replies: Vec<std::result::Result<Vec<Resource>, ListError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
            }
        }
    }

    #[async_trait]
    impl ResourceSource for ScriptedSource {
        async fn list(&self) -> std::result::Result<Vec<Resource>, ListError> {
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(Vec::new()))
        }
    }

    fn selector() -> ResourceSelector {
        ResourceSelector::new(vec!["PREUNI".to_string()], chrono::Duration::seconds(60))
    }

    #[tokio::test]
    async fn test_waits_through_errors_and_empty_listings() {
        let source = ScriptedSource::new(vec![
            Err(ListError::Timeout),
            Ok(vec![Resource::new("1", "Homecoming")]),
            Ok(vec![
                Resource::new("1", "Homecoming"),
                Resource::new("2", "PREUNI Gala").with_quota(10, 3),
            ]),
        ]);

        let target = wait_for_target(
            &source,
            &selector(),
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
        .await
        .unwrap();

        assert_eq!(target.id, "2");
    }

    #[tokio::test]
    async fn test_rejected_listing_is_retried() {
        let source = ScriptedSource::new(vec![
            Err(ListError::Status {
                status: 403,
                body: "forbidden".to_string(),
            }),
            Err(ListError::Status {
                status: 401,
                body: "unauthenticated".to_string(),
            }),
            Ok(vec![Resource::new("1", "PREUNI Gala").with_quota(10, 3)]),
        ]);

        let target = wait_for_target(
            &source,
            &selector(),
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
        .await
        .unwrap();

        assert_eq!(target.id, "1");
    }
}
