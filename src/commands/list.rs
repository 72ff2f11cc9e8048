use anyhow::{Context, Result};
use chrono::Utc;
use std::sync::Arc;

use crate::client::list::{EventLister, ResourceSource};
use crate::config::{Config, Credentials};
use crate::selector::ResourceSelector;

/// Print one listing, best-scored first
pub async fn list(config: Config, credentials: Credentials) -> Result<()> {
    let session = super::login(&config, &credentials)
        .await
        .context("Login failed")?;

    let lister = EventLister::new(Arc::clone(&session), config.site.list_endpoint.clone());
    let resources = lister.list().await.context("Failed to list events")?;

    let selector = ResourceSelector::from_config(&config);
    let ranked = selector.rank(&resources, Utc::now());

    println!("Events ({})", ranked.len());
    println!("==========");
    for (score, resource) in ranked {
        let marker = if selector.is_target(resource) { "*" } else { " " };
        let booked = if resource.is_booked() { " (booked)" } else { "" };
        println!("{marker} {score:>20}  {resource}{booked}");
    }

    if let Ok(best) = selector.pick(&resources, Utc::now()) {
        println!("\nWould target: {best}");
    }

    Ok(())
}
