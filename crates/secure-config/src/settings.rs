//! Settings for the default encryptor registry.
//!
//! Values are read from `SECURE_CONFIG_*` environment variables. Every field has
//! a default, but the default password and salt are public sample values: any
//! deployment that stores real secrets must override them.

use anyhow::{Context, Result};
use common::EnvelopeFormat;
use serde::Deserialize;
use tracing::warn;

/// Prefix of the environment variables [`Settings::from_env`] reads.
pub const ENV_PREFIX: &str = "SECURE_CONFIG";

/// Password shipped as a sample. Not a secret.
pub const SAMPLE_PASSWORD: &str = "pass";

/// Salt shipped as a sample. Not a secret.
pub const SAMPLE_SALT: &str = "8560b4f4b3";

/// Validated registry settings.
#[derive(Clone, Deserialize)]
pub struct Settings {
    /// Scheme used when encrypting without naming one.
    #[serde(default = "default_scheme")]
    pub default_scheme: String,

    /// Envelope delimiter before the scheme id.
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,

    /// Envelope delimiter after the scheme id. Must not be empty; whitespace is
    /// allowed.
    #[serde(default = "default_id_suffix")]
    pub id_suffix: String,

    /// Password the default scheme keys are derived from.
    #[serde(default = "default_password")]
    pub password: String,

    /// Salt the default scheme keys are derived from.
    #[serde(default = "default_salt")]
    pub salt: String,

    /// Tracing log level (e.g. `"info"`, `"debug"`).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_scheme() -> String {
    "text".into()
}
fn default_id_prefix() -> String {
    common::DEFAULT_ID_PREFIX.into()
}
fn default_id_suffix() -> String {
    common::DEFAULT_ID_SUFFIX.into()
}
fn default_password() -> String {
    SAMPLE_PASSWORD.into()
}
fn default_salt() -> String {
    SAMPLE_SALT.into()
}
fn default_log_level() -> String {
    "info".into()
}

impl Settings {
    /// Load and validate settings from `SECURE_CONFIG_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable cannot be parsed or a value is invalid.
    pub fn from_env() -> Result<Self> {
        Self::from_environment(config::Environment::with_prefix(ENV_PREFIX))
    }

    /// Load and validate settings from an explicit [`config::Environment`].
    ///
    /// Defaults apply to every variable the environment does not set.
    pub fn from_environment(environment: config::Environment) -> Result<Self> {
        let cfg = config::Config::builder()
            .add_source(environment)
            .build()
            .context("failed to build secure-config settings from environment")?;

        let s: Settings = cfg
            .try_deserialize()
            .context("failed to deserialise secure-config settings")?;

        s.validate()?;
        Ok(s)
    }

    /// Validate all fields, returning a descriptive error on the first failure.
    ///
    /// Delimiters follow [`EnvelopeFormat::new`]: the suffix must be non-empty
    /// but may be whitespace.
    pub fn validate(&self) -> Result<()> {
        let format = self.envelope_format()?;
        ensure_non_empty(&self.default_scheme, "SECURE_CONFIG_DEFAULT_SCHEME")?;
        format
            .check_scheme_id(&self.default_scheme)
            .context("invalid SECURE_CONFIG_DEFAULT_SCHEME")?;
        ensure_non_empty(&self.password, "SECURE_CONFIG_PASSWORD")?;
        ensure_non_empty(&self.salt, "SECURE_CONFIG_SALT")?;

        if self.uses_sample_key() {
            warn!("default schemes use the sample password/salt; override SECURE_CONFIG_PASSWORD and SECURE_CONFIG_SALT");
        }
        Ok(())
    }

    /// The envelope delimiters these settings describe.
    ///
    /// # Errors
    ///
    /// Returns an error if the suffix is empty or the prefix contains it.
    pub fn envelope_format(&self) -> Result<EnvelopeFormat> {
        EnvelopeFormat::new(self.id_prefix.clone(), self.id_suffix.clone())
            .context("invalid SECURE_CONFIG_ID_PREFIX / SECURE_CONFIG_ID_SUFFIX")
    }

    /// `true` when the sample password or salt is in use.
    pub fn uses_sample_key(&self) -> bool {
        self.password == SAMPLE_PASSWORD || self.salt == SAMPLE_SALT
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_scheme: default_scheme(),
            id_prefix: default_id_prefix(),
            id_suffix: default_id_suffix(),
            password: default_password(),
            salt: default_salt(),
            log_level: default_log_level(),
        }
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("default_scheme", &self.default_scheme)
            .field("id_prefix", &self.id_prefix)
            .field("id_suffix", &self.id_suffix)
            .field("password", &"[REDACTED]")
            .field("salt", &"[REDACTED]")
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn ensure_non_empty(value: &str, name: &str) -> Result<()> {
    if value.trim().is_empty() {
        anyhow::bail!("{name} must not be empty");
    }
    Ok(())
}
