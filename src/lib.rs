//! burstbook - Timed acquisition engine for quota-limited event reservations
//!
//! Logs in to a reservation backend, waits for a matching event, discovers
//! which booking endpoint the backend accepts and fires a burst of
//! concurrent booking attempts the moment the reservation window opens.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`client`] - Authenticated session, AJAX headers and event listing
//! - [`booking`] - Endpoint discovery, dispatch with retry, burst fan-out
//! - [`scheduler`] - Precise wait for the open instant
//! - [`selector`] - Scoring and target election
//! - [`models`] - Core data structures and types
//! - [`commands`] - CLI command implementations
//! - [`utils`] - Common utilities and helpers
//!
//! # Example
//!
//! ```no_run
//! use burstbook::booking::AcquisitionEngine;
//! use burstbook::config::{Config, Credentials};
//! use burstbook::models::Resource;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let credentials = Credentials::from_env(None, None)?;
//!     let session = burstbook::commands::login(&config, &credentials).await?;
//!
//!     let engine = AcquisitionEngine::from_config(&config, session);
//!     let verdict = engine.run(&Resource::new("42", "PREUNI Gala")).await;
//!     println!("success: {}", verdict.success);
//!     Ok(())
//! }
//! ```

pub mod booking;
pub mod client;
pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod scheduler;
pub mod selector;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::booking::{AcquisitionEngine, AttemptOutcome, BurstVerdict, OutcomeKind};
    pub use crate::client::list::{EventLister, ResourceSource};
    pub use crate::client::Session;
    pub use crate::config::{Config, Credentials};
    pub use crate::error::{BurstbookErrorTrait, Error, ErrorCategory, Result};
    pub use crate::models::Resource;
    pub use crate::scheduler::{OpenWaiter, WaitOutcome};
    pub use crate::selector::ResourceSelector;
}

// Direct re-exports for convenience
pub use models::Resource;
