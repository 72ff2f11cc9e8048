//! Endpoint discovery
//!
//! The backend's booking contract is not documented, so the resolver finds
//! it by trial: every candidate path is probed with every payload shape, in
//! priority order, until the backend answers with something other than an
//! unmatched-route marker. The first accepted pair is cached for the rest of
//! the run; when nothing is accepted the configured fallback endpoint is used
//! with the enroll action shape.
//!
//! # Example
//!
//! ```no_run
//! use burstbook::booking::endpoint::{EndpointCache, EndpointResolver};
//! use burstbook::client::Session;
//! use burstbook::config::Config;
//! use burstbook::models::Resource;
//! use std::sync::Arc;
//!
//! # async fn demo() -> anyhow::Result<()> {
//! let config = Config::default();
//! let session = Arc::new(Session::from_site(&config.site, config.request_timeout())?);
//! let resolver = EndpointResolver::from_config(session, &config, EndpointCache::new());
//!
//! let resolved = resolver.resolve(&Resource::new("42", "Gala")).await;
//! println!("booking via {}", resolved.path);
//! # Ok(())
//! # }
//! ```

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::booking::classify::{is_route_rejected, probe_accepts, HttpReply};
use crate::client::Session;
use crate::config::Config;
use crate::models::Resource;
use crate::utils::body_preview;

/// Placeholder replaced by the resource identifier in payload templates
pub const RESOURCE_ID_PLACEHOLDER: &str = "{id}";

/// Form field carrying the anti-forgery token
pub const CSRF_FIELD: &str = "_token";

/// Body encoding of booking requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PayloadEncoding {
    /// `application/x-www-form-urlencoded`
    #[default]
    Form,
    /// `application/json`
    Json,
}

impl FromStr for PayloadEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "form" => Ok(Self::Form),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown payload encoding: {other}")),
        }
    }
}

/// One field of a payload template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadField {
    pub name: String,
    /// Literal value; `{id}` is replaced by the resource identifier
    pub value: String,
}

/// Payload template for the booking action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadShape {
    pub name: String,
    pub fields: Vec<PayloadField>,
}

/// Encoded request body
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Form(Vec<(String, String)>),
    Json(Value),
}

impl PayloadShape {
    /// Build a shape from `(field, value)` pairs
    pub fn new(name: impl Into<String>, fields: &[(&str, &str)]) -> Self {
        Self {
            name: name.into(),
            fields: fields
                .iter()
                .map(|(name, value)| PayloadField {
                    name: (*name).to_string(),
                    value: (*value).to_string(),
                })
                .collect(),
        }
    }

    /// The site's own enroll action: `a=enroll_event&id={id}`
    pub fn enroll() -> Self {
        Self::new("enroll", &[("a", "enroll_event"), ("id", RESOURCE_ID_PLACEHOLDER)])
    }

    /// Probe variants in priority order
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::enroll(),
            Self::new(
                "book",
                &[
                    ("a", "book"),
                    ("event_id", RESOURCE_ID_PLACEHOLDER),
                    ("participant_type", "all"),
                    ("qty", "1"),
                ],
            ),
            Self::new(
                "register",
                &[
                    ("action", "register"),
                    ("event_id", RESOURCE_ID_PLACEHOLDER),
                    ("qty", "1"),
                ],
            ),
            Self::new(
                "reserve",
                &[
                    ("event_id", RESOURCE_ID_PLACEHOLDER),
                    ("participant_type", "all"),
                    ("qty", "1"),
                ],
            ),
        ]
    }

    /// Render the template for a resource
    ///
    /// The CSRF token, when present, is appended as `_token` unless the
    /// template already defines that field. In JSON mode a field that is
    /// exactly `{id}` is emitted as a number when the identifier is numeric.
    pub fn render(
        &self,
        resource_id: &str,
        csrf_token: Option<&str>,
        encoding: PayloadEncoding,
    ) -> RequestBody {
        let mut pairs: Vec<(String, String)> = self
            .fields
            .iter()
            .map(|field| {
                (
                    field.name.clone(),
                    field.value.replace(RESOURCE_ID_PLACEHOLDER, resource_id),
                )
            })
            .collect();

        if let Some(token) = csrf_token {
            if !self.fields.iter().any(|f| f.name == CSRF_FIELD) {
                pairs.push((CSRF_FIELD.to_string(), token.to_string()));
            }
        }

        match encoding {
            PayloadEncoding::Form => RequestBody::Form(pairs),
            PayloadEncoding::Json => {
                let mut map = Map::new();
                for (name, value) in pairs {
                    let is_id = self
                        .fields
                        .iter()
                        .any(|f| f.name == name && f.value == RESOURCE_ID_PLACEHOLDER);
                    let json = match value.parse::<i64>() {
                        Ok(n) if is_id => Value::from(n),
                        _ => Value::String(value),
                    };
                    map.insert(name, json);
                }
                RequestBody::Json(Value::Object(map))
            }
        }
    }

    /// `a=b&c=d` style rendering for logs
    pub fn describe(&self, resource_id: &str) -> String {
        self.fields
            .iter()
            .map(|f| {
                let value = f.value.replace(RESOURCE_ID_PLACEHOLDER, resource_id);
                format!("{}={value}", f.name)
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}

/// Candidate booking path with its payload variants
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointCandidate {
    pub path: String,
    pub shapes: Vec<PayloadShape>,
}

impl EndpointCandidate {
    pub fn new(path: impl Into<String>, shapes: Vec<PayloadShape>) -> Self {
        Self {
            path: path.into(),
            shapes,
        }
    }
}

/// How a resolved endpoint was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// Accepted by a probe after `probes` requests
    Probed { probes: u32 },
    /// Nothing was accepted; configured default
    Fallback,
}

/// The (path, payload shape) pair used for acquisition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedEndpoint {
    pub path: String,
    pub shape: PayloadShape,
    pub source: ResolutionSource,
}

impl ResolvedEndpoint {
    /// Fallback endpoint with the enroll action shape
    pub fn fallback(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            shape: PayloadShape::enroll(),
            source: ResolutionSource::Fallback,
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.source == ResolutionSource::Fallback
    }
}

impl fmt::Display for ResolvedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source {
            ResolutionSource::Probed { probes } => {
                write!(f, "{} [{}] after {probes} probe(s)", self.path, self.shape.name)
            }
            ResolutionSource::Fallback => {
                write!(f, "{} [{}] (fallback)", self.path, self.shape.name)
            }
        }
    }
}

/// Write-once holder of the resolved endpoint
///
/// Cloning yields another handle to the same slot.
#[derive(Debug, Clone, Default)]
pub struct EndpointCache {
    slot: Arc<OnceCell<ResolvedEndpoint>>,
}

impl EndpointCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached endpoint, if resolution already happened
    pub fn get(&self) -> Option<&ResolvedEndpoint> {
        self.slot.get()
    }

    pub fn is_resolved(&self) -> bool {
        self.slot.initialized()
    }

    /// Pin an endpoint without probing; returns false if one is already set
    pub fn preset(&self, endpoint: ResolvedEndpoint) -> bool {
        self.slot.set(endpoint).is_ok()
    }
}

/// Probe plan and pacing for [`EndpointResolver`]
#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// Candidates in priority order
    pub candidates: Vec<EndpointCandidate>,

    /// Path used when every probe is rejected
    pub fallback_path: String,

    /// Unmatched-route markers
    pub rejection_markers: Vec<String>,

    /// Encoding shared with real acquisition requests
    pub encoding: PayloadEncoding,

    /// Referer path sent with probes
    pub referer_path: String,

    /// Probe pacing; zero is treated as one
    pub probes_per_second: u32,
}

impl ResolverSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            candidates: config.endpoint_candidates(),
            fallback_path: config.fallback_endpoint().to_string(),
            rejection_markers: config.site.rejection_markers.clone(),
            encoding: config.site.payload_encoding,
            referer_path: config.site.list_endpoint.clone(),
            probes_per_second: config.burst.probe_rate_per_second,
        }
    }
}

/// Discovers which booking endpoint the backend accepts
pub struct EndpointResolver {
    session: Arc<Session>,
    settings: ResolverSettings,
    cache: EndpointCache,

    /// Paces probe traffic
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl EndpointResolver {
    /// Create a resolver writing into `cache`
    pub fn new(session: Arc<Session>, settings: ResolverSettings, cache: EndpointCache) -> Self {
        let rate = NonZeroU32::new(settings.probes_per_second).unwrap_or(NonZeroU32::MIN);

        Self {
            session,
            settings,
            cache,
            rate_limiter: RateLimiter::direct(Quota::per_second(rate)),
        }
    }

    /// Create a resolver from configuration
    pub fn from_config(session: Arc<Session>, config: &Config, cache: EndpointCache) -> Self {
        Self::new(session, ResolverSettings::from_config(config), cache)
    }

    /// Shared cache handle
    pub fn cache(&self) -> &EndpointCache {
        &self.cache
    }

    /// Encoding used for probes and acquisition
    pub fn encoding(&self) -> PayloadEncoding {
        self.settings.encoding
    }

    /// Resolve the booking endpoint, probing only on the first call
    ///
    /// Never fails: transport errors skip to the next candidate and
    /// exhaustion yields the fallback endpoint. Concurrent callers share a
    /// single discovery run.
    pub async fn resolve(&self, resource: &Resource) -> ResolvedEndpoint {
        self.cache
            .slot
            .get_or_init(|| self.discover(resource))
            .await
            .clone()
    }

    async fn discover(&self, resource: &Resource) -> ResolvedEndpoint {
        tracing::info!(
            candidates = self.settings.candidates.len(),
            resource = %resource.id,
            "Detecting booking endpoint"
        );

        let mut probes = 0_u32;

        'candidates: for candidate in &self.settings.candidates {
            tracing::debug!(path = %candidate.path, "Trying endpoint");

            for (index, shape) in candidate.shapes.iter().enumerate() {
                probes += 1;
                tracing::debug!(
                    path = %candidate.path,
                    variant = index + 1,
                    payload = %shape.describe(&resource.id),
                    "Probing"
                );

                let reply = match self.probe(&candidate.path, shape, resource).await {
                    Ok(reply) => reply,
                    Err(e) => {
                        tracing::warn!(
                            path = %candidate.path,
                            error = %e,
                            "Probe failed, skipping endpoint"
                        );
                        continue 'candidates;
                    }
                };

                tracing::debug!(
                    status = reply.status,
                    body = %body_preview(&reply.body),
                    rejected = is_route_rejected(&reply.body, &self.settings.rejection_markers),
                    "Probe reply"
                );

                if probe_accepts(&reply, &self.settings.rejection_markers) {
                    let resolved = ResolvedEndpoint {
                        path: candidate.path.clone(),
                        shape: shape.clone(),
                        source: ResolutionSource::Probed { probes },
                    };
                    tracing::info!(endpoint = %resolved, "Booking endpoint found");
                    return resolved;
                }
            }

            tracing::debug!(path = %candidate.path, "All payload variants rejected");
        }

        let fallback = ResolvedEndpoint::fallback(self.settings.fallback_path.clone());
        tracing::warn!(endpoint = %fallback, probes, "No endpoint accepted, using default");
        fallback
    }

    async fn probe(
        &self,
        path: &str,
        shape: &PayloadShape,
        resource: &Resource,
    ) -> Result<HttpReply, reqwest::Error> {
        self.rate_limiter.until_ready().await;

        let body = shape.render(&resource.id, self.session.csrf_token(), self.settings.encoding);
        self.session
            .post(path, &body, &self.settings.referer_path)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_form_with_token() {
        let body = PayloadShape::enroll().render("42", Some("tok"), PayloadEncoding::Form);
        assert_eq!(
            body,
            RequestBody::Form(vec![
                ("a".to_string(), "enroll_event".to_string()),
                ("id".to_string(), "42".to_string()),
                ("_token".to_string(), "tok".to_string()),
            ])
        );
    }

    #[test]
    fn test_render_json_numeric_id() {
        let body = PayloadShape::enroll().render("42", None, PayloadEncoding::Json);
        assert_eq!(body, RequestBody::Json(json!({ "a": "enroll_event", "id": 42 })));
    }

    #[test]
    fn test_render_json_opaque_id_and_literal_numbers() {
        let shape = PayloadShape::new("book", &[("event_id", "{id}"), ("qty", "1")]);
        let body = shape.render("ev-7", Some("tok"), PayloadEncoding::Json);
        assert_eq!(
            body,
            RequestBody::Json(json!({ "event_id": "ev-7", "qty": "1", "_token": "tok" }))
        );
    }

    #[test]
    fn test_template_token_not_duplicated() {
        let shape = PayloadShape::new("custom", &[("_token", "fixed"), ("id", "{id}")]);
        let RequestBody::Form(fields) = shape.render("1", Some("tok"), PayloadEncoding::Form) else {
            panic!("expected form body");
        };
        assert_eq!(fields.iter().filter(|(n, _)| n == "_token").count(), 1);
    }

    #[test]
    fn test_default_shapes_order() {
        let names: Vec<_> = PayloadShape::defaults().into_iter().map(|s| s.name).collect();
        assert_eq!(names, ["enroll", "book", "register", "reserve"]);
    }

    #[test]
    fn test_describe() {
        assert_eq!(PayloadShape::enroll().describe("9"), "a=enroll_event&id=9");
    }

    #[test]
    fn test_encoding_from_str() {
        assert_eq!("JSON".parse::<PayloadEncoding>(), Ok(PayloadEncoding::Json));
        assert_eq!("form".parse::<PayloadEncoding>(), Ok(PayloadEncoding::Form));
        assert!("xml".parse::<PayloadEncoding>().is_err());
    }

    #[test]
    fn test_cache_preset_is_write_once() {
        let cache = EndpointCache::new();
        let handle = cache.clone();
        assert!(!cache.is_resolved());

        assert!(cache.preset(ResolvedEndpoint::fallback("/a")));
        assert!(!handle.preset(ResolvedEndpoint::fallback("/b")));
        assert_eq!(handle.get().unwrap().path, "/a");
    }

    #[test]
    fn test_resolved_display() {
        let resolved = ResolvedEndpoint {
            path: "/book".to_string(),
            shape: PayloadShape::enroll(),
            source: ResolutionSource::Probed { probes: 3 },
        };
        assert_eq!(resolved.to_string(), "/book [enroll] after 3 probe(s)");
        assert_eq!(
            ResolvedEndpoint::fallback("/list").to_string(),
            "/list [enroll] (fallback)"
        );
    }
}
