//! Unified error handling for the burstbook crate
//!
//! This module provides a unified error type that consolidates all domain-specific
//! errors into a single `Error` enum, while maintaining the ability to use
//! domain-specific errors when needed.
//!
//! # Architecture
//!
//! - [`BurstbookErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! Probe and acquisition failures are not errors: the resolver and the
//! dispatcher report them as classified outcomes.

use thiserror::Error;

pub use crate::utils::error::{ListError, SelectorError, SessionError};

/// Common trait for all burstbook error types
pub trait BurstbookErrorTrait: std::error::Error {
    /// Check if this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout, listing)
    Network,
    /// Authentication and session errors
    Session,
    /// Target selection errors
    Selection,
    /// Parsing and data extraction errors
    Parsing,
}

impl ErrorCategory {
    /// Human-readable name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Session => "session",
            Self::Selection => "selection",
            Self::Parsing => "parsing",
        }
    }
}

impl BurstbookErrorTrait for SessionError {
    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Http(_))
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Session
    }
}

impl BurstbookErrorTrait for ListError {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::UnexpectedShape(_) => true,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::UnexpectedShape(_) => ErrorCategory::Parsing,
            _ => ErrorCategory::Network,
        }
    }
}

impl BurstbookErrorTrait for SelectorError {
    fn is_recoverable(&self) -> bool {
        // the next listing cycle may bring candidates
        true
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Selection
    }
}

/// Unified error type for the burstbook crate
#[derive(Error, Debug)]
pub enum Error {
    /// Session and login errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    /// Resource listing errors
    #[error("Listing error: {0}")]
    List(#[from] ListError),

    /// Target selection errors
    #[error("Selector error: {0}")]
    Selector(#[from] SelectorError),
}

impl BurstbookErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Session(e) => e.is_recoverable(),
            Self::List(e) => e.is_recoverable(),
            Self::Selector(e) => e.is_recoverable(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Session(_) => ErrorCategory::Session,
            Self::List(e) => e.category(),
            Self::Selector(_) => ErrorCategory::Selection,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
