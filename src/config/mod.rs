//! Configuration management for burstbook
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Credentials are never read from the config file;
//! see [`Credentials::from_env`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use crate::booking::endpoint::{EndpointCandidate, PayloadEncoding, PayloadShape};
use crate::utils::retry::RetryConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend addresses and request contract candidates
    pub site: SiteConfig,

    /// Which resources to go after
    pub target: TargetConfig,

    /// Burst sizing, timing and retry tuning
    pub burst: BurstConfig,

    /// Listing poll cadence
    pub polling: PollingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Scheme and host of the reservation backend
    pub base_url: String,

    /// Page carrying the login form (and the CSRF token)
    pub login_page: String,

    /// Login form target
    pub login_endpoint: String,

    /// Listing endpoint, also the fallback booking endpoint
    pub list_endpoint: String,

    /// Booking endpoints to probe, in priority order
    pub booking_endpoints: Vec<String>,

    /// Endpoint used when no candidate is accepted (defaults to `list_endpoint`)
    pub fallback_endpoint: Option<String>,

    /// Payload shapes to probe on every candidate endpoint, in priority order
    pub payload_shapes: Vec<PayloadShape>,

    /// Body substrings that mean the backend has no route for a probe
    pub rejection_markers: Vec<String>,

    /// Body encoding for probes and acquisition requests
    pub payload_encoding: PayloadEncoding,

    /// User agent string
    pub user_agent: String,
}

/// Target selection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TargetConfig {
    /// Case-insensitive name keywords; any match qualifies
    pub keywords: Vec<String>,

    /// How long after opening a window still ranks as "now", in seconds
    pub tolerance_secs: u64,
}

/// Burst configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BurstConfig {
    /// Number of concurrent acquisition attempts
    pub parallel_shots: usize,

    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,

    /// Lead taken off the coarse sleep before the open instant
    pub arrive_early_ms: u64,

    /// Fine polling increment near the open instant
    pub micro_poll_ms: u64,

    /// Upper bound of the random startup delay of each attempt
    pub startup_jitter_ms: u64,

    /// Maximum endpoint probes per second during discovery
    pub probe_rate_per_second: u32,

    /// Retry policy of a single attempt
    pub retry: RetryConfig,
}

/// Listing poll configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay between listings while no target is found
    pub search_interval_secs: u64,

    /// Delay after a failed listing
    pub error_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

/// Account credentials
#[derive(Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

impl Credentials {
    /// Read `BURSTBOOK_EMAIL` and `BURSTBOOK_PASSWORD`
    ///
    /// Explicit values take precedence over the environment.
    pub fn from_env(email: Option<String>, password: Option<String>) -> Result<Self> {
        let email = email
            .or_else(|| std::env::var("BURSTBOOK_EMAIL").ok())
            .filter(|e| !e.trim().is_empty())
            .context("email missing: pass --email or set BURSTBOOK_EMAIL")?;
        let password = password
            .or_else(|| std::env::var("BURSTBOOK_PASSWORD").ok())
            .filter(|p| !p.is_empty())
            .context("password missing: set BURSTBOOK_PASSWORD")?;

        Ok(Self {
            email: email.trim().to_string(),
            password,
        })
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

fn env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|v| {
        v.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
}

impl Config {
    /// Load configuration from environment variables over the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(base_url) = std::env::var("BURSTBOOK_BASE_URL") {
            config.site.base_url = base_url;
        }
        if let Some(mode) = env_parse::<PayloadEncoding>("BURSTBOOK_PAYLOAD_MODE") {
            config.site.payload_encoding = mode;
        }
        if let Some(keywords) = env_list("BURSTBOOK_KEYWORDS") {
            config.target.keywords = keywords;
        }
        if let Some(shots) = env_parse("BURSTBOOK_PARALLEL_SHOTS") {
            config.burst.parallel_shots = shots;
        }
        if let Some(retries) = env_parse("BURSTBOOK_MAX_RETRIES") {
            config.burst.retry.max_retries = retries;
        }
        if let Some(timeout) = env_parse("BURSTBOOK_TIMEOUT_MS") {
            config.burst.request_timeout_ms = timeout;
        }
        if let Some(early) = env_parse("BURSTBOOK_ARRIVE_EARLY_MS") {
            config.burst.arrive_early_ms = early;
        }
        if let Ok(level) = std::env::var("BURSTBOOK_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Ok(format) = std::env::var("BURSTBOOK_LOG_FORMAT") {
            config.logging.format = format;
        }

        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.site.base_url)
            .with_context(|| format!("base_url is not a valid URL: {}", self.site.base_url))?;
        if !matches!(base.scheme(), "http" | "https") {
            anyhow::bail!("base_url must be http or https");
        }

        for path in [
            &self.site.login_page,
            &self.site.login_endpoint,
            &self.site.list_endpoint,
        ]
        .into_iter()
        .chain(self.site.booking_endpoints.iter())
        .chain(self.site.fallback_endpoint.iter())
        {
            if !path.starts_with('/') {
                anyhow::bail!("endpoint paths must start with '/': {path}");
            }
        }

        if !self.site.booking_endpoints.is_empty() && self.site.payload_shapes.is_empty() {
            anyhow::bail!("payload_shapes must not be empty when booking_endpoints are set");
        }

        if self.burst.parallel_shots == 0 {
            anyhow::bail!("parallel_shots must be greater than 0");
        }

        if self.burst.request_timeout_ms == 0 {
            anyhow::bail!("request_timeout_ms must be greater than 0");
        }

        if self.burst.micro_poll_ms == 0 {
            anyhow::bail!("micro_poll_ms must be greater than 0");
        }

        if self.burst.probe_rate_per_second == 0 {
            anyhow::bail!("probe_rate_per_second must be greater than 0");
        }

        if self.polling.search_interval_secs == 0 || self.polling.error_interval_secs == 0 {
            anyhow::bail!("polling intervals must be greater than 0");
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.burst.request_timeout_ms)
    }

    /// Endpoint used when discovery accepts nothing
    #[must_use]
    pub fn fallback_endpoint(&self) -> &str {
        self.site
            .fallback_endpoint
            .as_deref()
            .unwrap_or(&self.site.list_endpoint)
    }

    /// Probe candidates in priority order
    #[must_use]
    pub fn endpoint_candidates(&self) -> Vec<EndpointCandidate> {
        self.site
            .booking_endpoints
            .iter()
            .map(|path| EndpointCandidate::new(path.clone(), self.site.payload_shapes.clone()))
            .collect()
    }

    /// Backward tolerance of the selector's time term
    #[must_use]
    pub fn tolerance(&self) -> chrono::Duration {
        // capped at a year
        let secs = self.target.tolerance_secs.min(365 * 86_400);
        chrono::Duration::seconds(secs as i64)
    }

    /// Delay between listings while searching
    #[must_use]
    pub fn search_interval(&self) -> Duration {
        Duration::from_secs(self.polling.search_interval_secs)
    }

    /// Delay after a failed listing
    #[must_use]
    pub fn error_interval(&self) -> Duration {
        Duration::from_secs(self.polling.error_interval_secs)
    }
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            base_url: String::from("http://localhost:8080"),
            login_page: String::from("/login"),
            login_endpoint: String::from("/login"),
            list_endpoint: String::from("/alumni/presuniv_events"),
            booking_endpoints: vec![
                String::from("/alumni/presuniv_events"),
                String::from("/alumni/presuniv_events/book"),
                String::from("/alumni/presuniv_events/reservation"),
            ],
            fallback_endpoint: None,
            payload_shapes: PayloadShape::defaults(),
            rejection_markers: vec![
                String::from("unknown AJAX route"),
                String::from("no handler for this route"),
                String::from("404"),
            ],
            payload_encoding: PayloadEncoding::Form,
            user_agent: format!("burstbook/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            keywords: vec![String::from("PREUNI")],
            tolerance_secs: 60,
        }
    }
}

impl Default for BurstConfig {
    fn default() -> Self {
        Self {
            parallel_shots: 4,
            request_timeout_ms: 4_000,
            arrive_early_ms: 250,
            micro_poll_ms: 10,
            startup_jitter_ms: 25,
            probe_rate_per_second: 5,
            retry: RetryConfig::default(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            search_interval_secs: 10,
            error_interval_secs: 20,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}
