//! Resource listing
//!
//! This module provides the listing collaborator that feeds the selector:
//! one POST against the listing endpoint returns every event of the current
//! month as a loosely typed JSON array under `result`.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;

use crate::booking::endpoint::RequestBody;
use crate::client::Session;
use crate::models::{EventRecord, Resource};
use crate::utils::error::ListError;
use crate::utils::{body_preview, current_wib_month};

/// Source of resource snapshots
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// Fetch the current set of resources
    async fn list(&self) -> Result<Vec<Resource>, ListError>;
}

/// Lists events through the backend's `list_all` action
pub struct EventLister {
    session: Arc<Session>,
    list_endpoint: String,
}

impl EventLister {
    /// Create new lister
    #[must_use]
    pub fn new(session: Arc<Session>, list_endpoint: impl Into<String>) -> Self {
        Self {
            session,
            list_endpoint: list_endpoint.into(),
        }
    }

    /// Form body for one listing call
    fn list_body(event_month: &str) -> RequestBody {
        RequestBody::Form(vec![
            ("a".to_string(), "list_all".to_string()),
            ("event_date".to_string(), event_month.to_string()),
        ])
    }

    /// Parse a listing reply body into resources
    ///
    /// # Errors
    ///
    /// Returns `ListError::UnexpectedShape` unless the body is a JSON object
    /// with an array under `result`
    pub fn parse_listing(body: &str) -> Result<Vec<Resource>, ListError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|_| ListError::UnexpectedShape(body_preview(body)))?;

        let Some(Value::Array(rows)) = value.get("result") else {
            return Err(ListError::UnexpectedShape(body_preview(body)));
        };

        let resources = rows
            .iter()
            .filter_map(|row| serde_json::from_value::<EventRecord>(row.clone()).ok())
            .map(Resource::from)
            .collect();

        Ok(resources)
    }
}

#[async_trait]
impl ResourceSource for EventLister {
    async fn list(&self) -> Result<Vec<Resource>, ListError> {
        let month = current_wib_month(Utc::now());
        tracing::debug!(endpoint = %self.list_endpoint, month = %month, "Fetching event list");

        let reply = self
            .session
            .post(&self.list_endpoint, &Self::list_body(&month), &self.list_endpoint)
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ListError::Timeout
                } else {
                    ListError::Http(e)
                }
            })?;

        if reply.status != 200 {
            return Err(ListError::Status {
                status: reply.status,
                body: body_preview(&reply.body),
            });
        }

        let resources = Self::parse_listing(&reply.body)?;
        tracing::debug!(count = resources.len(), "Event list fetched");
        Ok(resources)
    }
}

/// Fixed set of resources, for tests and dry runs
pub struct StaticSource {
    resources: Vec<Resource>,
}

impl StaticSource {
    #[must_use]
    pub fn new(resources: Vec<Resource>) -> Self {
        Self { resources }
    }
}

#[async_trait]
impl ResourceSource for StaticSource {
    async fn list(&self) -> Result<Vec<Resource>, ListError> {
        Ok(self.resources.clone())
    }
}
