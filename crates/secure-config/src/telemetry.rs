//! Logging initialisation for applications embedding `secure-config`.
//!
//! The library itself only emits `tracing` events. Hosts that have no
//! subscriber of their own can call [`init`] once at startup with the
//! [`Settings`] they built the registry from.
//!
//! Property values are never logged, only their keys.

use anyhow::{Context, Result};
use tracing::Subscriber;
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

/// Filter for `settings.log_level`, unless `RUST_LOG` is set.
pub fn filter(settings: &Settings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level))
}

/// Structured JSON subscriber writing to stdout, filtered by [`filter`].
///
/// Not installed; pair with [`tracing::subscriber::with_default`] to scope it.
pub fn subscriber(settings: &Settings) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter(settings))
        .finish()
}

/// Install [`subscriber`] as the global default.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been set.
pub fn init(settings: &Settings) -> Result<()> {
    tracing::subscriber::set_global_default(subscriber(settings))
        .context("failed to initialise secure-config tracing subscriber")
}
