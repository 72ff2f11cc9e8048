//! Response classification
//!
//! Pure functions that turn a `{status, body}` reply into a verdict. The
//! backend answers in loosely typed shapes (JSON objects with various flags,
//! bare strings, HTML), so success is sniffed from a small set of markers and
//! a bare 2xx is trusted when nothing says otherwise.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Raw reply of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Verdict for one acquisition call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Accepted; `confirmed` is false when only the 2xx status vouches for it
    Success { confirmed: bool },
    /// Throttling or server overload, worth another try
    Retryable,
    /// Definitive rejection of this call
    Fatal,
}

/// Signal carried by a response body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodySignal {
    Positive,
    Negative,
    Ambiguous,
}

fn success_word() -> &'static Regex {
    static SUCCESS_RE: OnceLock<Regex> = OnceLock::new();
    SUCCESS_RE
        .get_or_init(|| Regex::new(r"(?i)success|berhasil").expect("Invalid regex pattern"))
}

/// Classify an acquisition reply
///
/// 1. 2xx: any positive marker → confirmed success, even next to an error
///    marker; otherwise an explicit error marker → fatal; otherwise
///    unconfirmed success.
/// 2. 429 or 5xx → retryable.
/// 3. Anything else → fatal.
pub fn classify(reply: &HttpReply) -> Classification {
    match reply.status {
        200..=299 => match body_signal(&reply.body) {
            BodySignal::Positive => Classification::Success { confirmed: true },
            BodySignal::Negative => Classification::Fatal,
            BodySignal::Ambiguous => Classification::Success { confirmed: false },
        },
        429 | 500..=599 => Classification::Retryable,
        _ => Classification::Fatal,
    }
}

/// Whether a probe reply carries one of the unmatched-route markers
pub fn is_route_rejected(body: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|marker| !marker.is_empty() && body.contains(marker.as_str()))
}

/// Whether a probe reply shows the backend accepted the (path, shape) pair
pub fn probe_accepts(reply: &HttpReply, markers: &[String]) -> bool {
    if is_route_rejected(&reply.body, markers) {
        return false;
    }
    reply.status == 200 && !reply.body.trim().is_empty()
}

fn body_signal(body: &str) -> BodySignal {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => object_signal(&map),
        Ok(Value::String(text)) => text_signal(&text),
        Ok(_) => BodySignal::Ambiguous,
        Err(_) => text_signal(body),
    }
}

fn object_signal(map: &serde_json::Map<String, Value>) -> BodySignal {
    let status = match map.get("status") {
        Some(Value::String(status)) => status.to_ascii_lowercase(),
        _ => String::new(),
    };

    let positive = map.get("success") == Some(&Value::Bool(true))
        || matches!(status.as_str(), "ok" | "success")
        || matches!(map.get("message"), Some(Value::String(m)) if success_word().is_match(m))
        || map.get("error") == Some(&Value::Bool(false));
    if positive {
        return BodySignal::Positive;
    }

    let negative = map.get("success") == Some(&Value::Bool(false))
        || map.get("error") == Some(&Value::Bool(true))
        || matches!(status.as_str(), "error" | "fail" | "failed");
    if negative {
        BodySignal::Negative
    } else {
        BodySignal::Ambiguous
    }
}

fn text_signal(text: &str) -> BodySignal {
    if success_word().is_match(text) {
        BodySignal::Positive
    } else {
        BodySignal::Ambiguous
    }
}
