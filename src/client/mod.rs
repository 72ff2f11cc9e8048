//! Authenticated HTTP session against the reservation backend
//!
//! The [`Session`] owns the cookie jar and the CSRF token captured at login.
//! It is shared read-only by every probe, listing and acquisition request;
//! the burst never mutates it.

pub mod headers;
pub mod list;

use regex::Regex;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::Client;
use scraper::{Html, Selector};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use url::Url;

use crate::booking::classify::HttpReply;
use crate::booking::endpoint::RequestBody;
use crate::config::{Credentials, SiteConfig};
use crate::utils::body_preview;
use crate::utils::error::SessionError;

static TOKEN_INPUT: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse(r#"input[name="_token"]"#).ok());
static TOKEN_META: LazyLock<Option<Selector>> =
    LazyLock::new(|| Selector::parse(r#"meta[name="csrf-token"]"#).ok());
static SESSION_COOKIE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)session|sk_puis2|phpsessid").unwrap());

/// Cookie-backed client bound to one backend
pub struct Session {
    /// HTTP client sharing `jar`
    client: Client,

    /// Cookie store populated by login
    jar: Arc<Jar>,

    /// Base URL without trailing slash
    base_url: String,

    /// Parsed base URL, used for cookie lookups
    base: Url,

    /// Serialized origin for `Origin` headers
    origin: String,

    /// Anti-forgery token captured from the login page
    csrf_token: Option<String>,
}

impl Session {
    /// Create an unauthenticated session
    ///
    /// # Errors
    ///
    /// Returns `SessionError::InvalidUrl` for a malformed base URL and
    /// `SessionError::Http` if the HTTP client cannot be created
    pub fn new(base_url: &str, user_agent: &str, timeout: Duration) -> Result<Self, SessionError> {
        let base = Url::parse(base_url)
            .map_err(|e| SessionError::InvalidUrl(format!("{base_url}: {e}")))?;
        let jar = Arc::new(Jar::default());

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .cookie_provider(Arc::clone(&jar))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            jar,
            base_url: base_url.trim_end_matches('/').to_string(),
            origin: base.origin().ascii_serialization(),
            base,
            csrf_token: None,
        })
    }

    /// Create a session from site configuration
    pub fn from_site(site: &SiteConfig, timeout: Duration) -> Result<Self, SessionError> {
        Self::new(&site.base_url, &site.user_agent, timeout)
    }

    /// Create a session with a custom base URL and default tuning, for tests
    pub fn with_base_url(base_url: &str) -> Result<Self, SessionError> {
        Self::new(base_url, "burstbook-test", Duration::from_secs(5))
    }

    /// Attach a previously captured anti-forgery token
    #[must_use]
    pub fn with_csrf_token(mut self, token: impl Into<String>) -> Self {
        self.csrf_token = Some(token.into());
        self
    }

    /// Anti-forgery token, when the backend issued one
    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    /// Absolute URL for a backend path
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Origin of the backend (`scheme://host[:port]`)
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// POST a body and capture the raw reply
    ///
    /// Any status is returned as a reply; only transport failures (connect,
    /// timeout, body read) are errors.
    pub async fn post(
        &self,
        path: &str,
        body: &RequestBody,
        referer_path: &str,
    ) -> Result<HttpReply, reqwest::Error> {
        let request = self
            .client
            .post(self.url(path))
            .headers(headers::build_ajax_headers(&self.origin, &self.url(referer_path)));

        let request = match body {
            RequestBody::Form(fields) => request.form(fields),
            RequestBody::Json(value) => request.json(value),
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(HttpReply { status, body })
    }

    /// Whether the jar holds a cookie that looks like a session cookie
    pub fn has_session_cookie(&self) -> bool {
        self.jar
            .cookies(&self.base)
            .and_then(|value| value.to_str().map(str::to_string).ok())
            .is_some_and(|cookies| {
                cookies
                    .split(';')
                    .filter_map(|pair| pair.split('=').next())
                    .any(|name| SESSION_COOKIE.is_match(name.trim()))
            })
    }

    /// Log in with form credentials, falling back to JSON on transport error
    ///
    /// The login page is fetched first to capture a CSRF token, which is then
    /// kept on the session for later requests. A 2xx or 3xx answer counts as
    /// success.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::LoginRejected` for any other status and
    /// `SessionError::Http` when both attempts fail in transport
    pub async fn login(
        &mut self,
        site: &SiteConfig,
        credentials: &Credentials,
    ) -> Result<(), SessionError> {
        self.csrf_token = self.fetch_csrf_token(&site.login_page).await;
        tracing::debug!(has_token = self.csrf_token.is_some(), "Fetched login page");

        let mut form = vec![
            ("email".to_string(), credentials.email.clone()),
            ("password".to_string(), credentials.password.clone()),
        ];
        if let Some(token) = &self.csrf_token {
            form.push(("_token".to_string(), token.clone()));
        }

        let page_headers = headers::build_page_headers(&self.origin, &self.url(&site.login_page));
        let form_attempt = self
            .client
            .post(self.url(&site.login_endpoint))
            .headers(page_headers.clone())
            .form(&form)
            .send()
            .await;

        let response = match form_attempt {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Form login failed, retrying as JSON");
                let mut payload = serde_json::json!({
                    "email": credentials.email,
                    "password": credentials.password,
                });
                if let Some(token) = &self.csrf_token {
                    payload["_token"] = serde_json::Value::String(token.clone());
                }
                self.client
                    .post(self.url(&site.login_endpoint))
                    .headers(page_headers)
                    .json(&payload)
                    .send()
                    .await?
            }
        };

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            let body = response.text().await.unwrap_or_default();
            return Err(SessionError::LoginRejected {
                status: status.as_u16(),
                body: body_preview(&body),
            });
        }

        if !self.has_session_cookie() {
            tracing::warn!("No session cookie after login, the session may not be authenticated");
        }

        tracing::info!(status = status.as_u16(), "Login accepted");
        Ok(())
    }

    /// Fetch the login page and extract a CSRF token, if any
    async fn fetch_csrf_token(&self, login_page: &str) -> Option<String> {
        let response = self
            .client
            .get(self.url(login_page))
            .headers(headers::build_page_headers(&self.origin, &self.url(login_page)))
            .send()
            .await
            .ok()?;

        let status = response.status();
        if !(status.is_success() || status.is_redirection()) {
            return None;
        }

        let html = response.text().await.ok()?;
        extract_csrf_token(&html)
    }
}

/// Extract a Laravel-style CSRF token from a page
///
/// Looks for a hidden `_token` input first, then a `csrf-token` meta tag.
pub fn extract_csrf_token(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let from_input = TOKEN_INPUT.as_ref().and_then(|selector| {
        document
            .select(selector)
            .find_map(|el| el.value().attr("value").map(str::to_string))
    });

    from_input
        .or_else(|| {
            TOKEN_META.as_ref().and_then(|selector| {
                document
                    .select(selector)
                    .find_map(|el| el.value().attr("content").map(str::to_string))
            })
        })
        .filter(|token| !token.is_empty())
}
