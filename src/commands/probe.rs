use anyhow::{Context, Result};

use crate::booking::AcquisitionEngine;
use crate::config::{Config, Credentials};
use crate::models::Resource;

/// Run endpoint discovery for one event id and print the result
///
/// Probes send real booking requests; use an event that is safe to book.
pub async fn probe(config: Config, credentials: Credentials, event_id: String) -> Result<()> {
    let session = super::login(&config, &credentials)
        .await
        .context("Login failed")?;

    let engine = AcquisitionEngine::from_config(&config, session);
    let resolved = engine.prepare(&Resource::new(event_id.clone(), "")).await;

    println!("Event:    {event_id}");
    println!("Endpoint: {resolved}");
    println!("Payload:  {}", resolved.shape.describe(&event_id));
    if resolved.is_fallback() {
        println!("No candidate was accepted; acquisition would use the fallback endpoint");
    }

    Ok(())
}
