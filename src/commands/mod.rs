//! CLI command implementations
//!
//! - [`run`] - full flow: log in, search for the target, wait, fire
//! - [`list`] - one listing with selector scores
//! - [`probe`] - endpoint discovery for a given event id

pub mod list;
pub mod probe;
pub mod run;

use std::sync::Arc;

use crate::client::Session;
use crate::config::{Config, Credentials};
use crate::error::Result;

pub use list::list;
pub use probe::probe;
pub use run::{run, wait_for_target};

/// Open a session and log in
pub async fn login(config: &Config, credentials: &Credentials) -> Result<Arc<Session>> {
    let mut session = Session::from_site(&config.site, config.request_timeout())?;

    tracing::info!(base_url = %config.site.base_url, email = %credentials.email, "Logging in");
    session.login(&config.site, credentials).await?;

    Ok(Arc::new(session))
}
