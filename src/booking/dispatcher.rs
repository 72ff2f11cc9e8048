//! Single acquisition attempt with retry
//!
//! One [`RequestDispatcher::attempt`] sends the booking request through the
//! resolved endpoint and keeps retrying throttled (429), overloaded (5xx) and
//! transport-failed calls with jittered exponential backoff. A definitive
//! rejection stops it immediately.

use std::fmt;
use std::sync::Arc;

use crate::booking::classify::{classify, Classification, HttpReply};
use crate::booking::endpoint::{PayloadEncoding, ResolvedEndpoint};
use crate::client::Session;
use crate::models::Resource;
use crate::utils::body_preview;
use crate::utils::retry::RetryConfig;

/// Tri-state result of one attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    RetryableFailure,
    FatalFailure,
}

/// Result of one acquisition attempt, retries included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttemptOutcome {
    pub kind: OutcomeKind,

    /// False when a 2xx was accepted without any positive marker in the body
    pub confirmed: bool,

    /// Status of the last call, `None` when it failed in transport
    pub status: Option<u16>,

    /// Truncated body of the last call
    pub body: String,

    /// Transport error of the last call
    pub error: Option<String>,

    /// Network calls issued by this attempt
    pub calls: u32,
}

impl AttemptOutcome {
    fn from_reply(classification: Classification, reply: &HttpReply, calls: u32) -> Self {
        let (kind, confirmed) = match classification {
            Classification::Success { confirmed } => (OutcomeKind::Success, confirmed),
            Classification::Retryable => (OutcomeKind::RetryableFailure, false),
            Classification::Fatal => (OutcomeKind::FatalFailure, false),
        };

        Self {
            kind,
            confirmed,
            status: Some(reply.status),
            body: body_preview(&reply.body),
            error: None,
            calls,
        }
    }

    fn transport(error: &reqwest::Error, calls: u32) -> Self {
        Self {
            kind: OutcomeKind::RetryableFailure,
            confirmed: false,
            status: None,
            body: String::new(),
            error: Some(error.to_string()),
            calls,
        }
    }

    pub fn is_success(&self) -> bool {
        self.kind == OutcomeKind::Success
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match (self.kind, self.confirmed) {
            (OutcomeKind::Success, true) => "OK",
            (OutcomeKind::Success, false) => "OK?",
            (OutcomeKind::RetryableFailure, _) => "RETRY-EXHAUSTED",
            (OutcomeKind::FatalFailure, _) => "FAIL",
        };
        write!(f, "[{label}]")?;
        match (self.status, &self.error) {
            (Some(status), _) => write!(f, " HTTP {status}")?,
            (None, Some(error)) => write!(f, " {error}")?,
            (None, None) => {}
        }
        write!(f, " after {} call(s)", self.calls)?;
        if !self.body.is_empty() {
            write!(f, ": {}", self.body)?;
        }
        Ok(())
    }
}

/// Sends booking requests through a resolved endpoint
pub struct RequestDispatcher {
    session: Arc<Session>,
    retry: RetryConfig,
    encoding: PayloadEncoding,
    referer_path: String,
}

impl RequestDispatcher {
    /// Create a dispatcher
    ///
    /// # Arguments
    ///
    /// * `session` - Authenticated session shared with the resolver
    /// * `retry` - Backoff policy for one attempt
    /// * `encoding` - Body encoding, the same one used while probing
    /// * `referer_path` - Page the site's own scripts post from
    pub fn new(
        session: Arc<Session>,
        retry: RetryConfig,
        encoding: PayloadEncoding,
        referer_path: impl Into<String>,
    ) -> Self {
        Self {
            session,
            retry,
            encoding,
            referer_path: referer_path.into(),
        }
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.retry
    }

    /// Run one acquisition attempt
    ///
    /// Never fails: every path ends in a classified outcome. After the retry
    /// budget is spent the last retryable failure is returned as is.
    pub async fn attempt(
        &self,
        resource: &Resource,
        resolved: &ResolvedEndpoint,
    ) -> AttemptOutcome {
        let body = resolved
            .shape
            .render(&resource.id, self.session.csrf_token(), self.encoding);
        let max_calls = self.retry.max_calls();
        let mut calls = 0_u32;

        loop {
            calls += 1;

            let outcome = match self
                .session
                .post(&resolved.path, &body, &self.referer_path)
                .await
            {
                Ok(reply) => {
                    let classification = classify(&reply);
                    AttemptOutcome::from_reply(classification, &reply, calls)
                }
                Err(e) => AttemptOutcome::transport(&e, calls),
            };

            match outcome.kind {
                OutcomeKind::Success => {
                    if outcome.confirmed {
                        tracing::info!(
                            status = ?outcome.status,
                            body = %outcome.body,
                            "[OK] Booking accepted"
                        );
                    } else {
                        tracing::info!(
                            status = ?outcome.status,
                            body = %outcome.body,
                            "[OK?] 2xx without confirmation"
                        );
                    }
                    return outcome;
                }
                OutcomeKind::FatalFailure => {
                    tracing::error!(
                        status = ?outcome.status,
                        body = %outcome.body,
                        "[FAIL] Booking rejected"
                    );
                    return outcome;
                }
                OutcomeKind::RetryableFailure if calls >= max_calls => {
                    tracing::warn!(
                        status = ?outcome.status,
                        error = ?outcome.error,
                        calls,
                        "Retries exhausted"
                    );
                    return outcome;
                }
                OutcomeKind::RetryableFailure => {
                    let delay = self.retry.delay_with_jitter(calls - 1, &mut rand::thread_rng());
                    tracing::warn!(
                        status = ?outcome.status,
                        error = ?outcome.error,
                        attempt = calls,
                        max_retries = self.retry.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        "[RETRY] Backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_from_reply() {
        let reply = HttpReply::new(200, r#"{"success":true}"#);
        let outcome =
            AttemptOutcome::from_reply(Classification::Success { confirmed: true }, &reply, 1);
        assert!(outcome.is_success());
        assert!(outcome.confirmed);
        assert_eq!(outcome.status, Some(200));
    }

    #[test]
    fn test_outcome_body_truncated() {
        let reply = HttpReply::new(500, "x".repeat(2_000));
        let outcome = AttemptOutcome::from_reply(Classification::Retryable, &reply, 5);
        assert_eq!(outcome.kind, OutcomeKind::RetryableFailure);
        assert_eq!(outcome.body.chars().count(), crate::utils::BODY_PREVIEW_CHARS);
    }

    #[test]
    fn test_outcome_display() {
        let reply = HttpReply::new(404, "");
        let outcome = AttemptOutcome::from_reply(Classification::Fatal, &reply, 1);
        assert_eq!(outcome.to_string(), "[FAIL] HTTP 404 after 1 call(s)");

        let reply = HttpReply::new(200, "queued");
        let outcome =
            AttemptOutcome::from_reply(Classification::Success { confirmed: false }, &reply, 2);
        assert_eq!(outcome.to_string(), "[OK?] HTTP 200 after 2 call(s): queued");
    }
}
