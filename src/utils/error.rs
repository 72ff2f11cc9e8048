//! Error types for the burstbook engine
//!
//! This module defines the domain error types raised to callers. Expected
//! failures during probing and acquisition are never errors; they are
//! classified outcomes (see [`crate::booking::classify`]).

use thiserror::Error;

/// Errors raised while establishing the authenticated session
#[derive(Error, Debug)]
pub enum SessionError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Login endpoint answered with a non-2xx/3xx status
    #[error("Login rejected with HTTP {status}: {body}")]
    LoginRejected { status: u16, body: String },

    /// Invalid base URL or path
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Errors raised while fetching the resource listing
#[derive(Error, Debug)]
pub enum ListError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Listing endpoint answered with a status other than 200
    #[error("Listing failed with HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Response did not carry a `result` array
    #[error("Unexpected listing shape: {0}")]
    UnexpectedShape(String),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,
}

/// Errors raised by the resource selector
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// No candidate resources to choose from
    #[error("No resources to choose from")]
    EmptySet,
}
