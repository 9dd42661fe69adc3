//! Wire format of an encrypted configuration value.
//!
//! ```text
//! <prefix><scheme-id><suffix><cipher-output>
//! ```
//!
//! With the default delimiters a value looks like `{text}q8Zk...`. This is the
//! one format stored values depend on, so it must stay bit-exact.

use crate::error::EncryptorError;

/// Default delimiter placed before the scheme id.
pub const DEFAULT_ID_PREFIX: &str = "{";

/// Default delimiter placed after the scheme id.
pub const DEFAULT_ID_SUFFIX: &str = "}";

/// A value split into its scheme id and cipher output.
///
/// Parsing does not check whether the scheme is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Envelope<'a> {
    /// Text between the prefix and the first suffix.
    pub scheme_id: &'a str,
    /// Everything after the suffix.
    pub payload: &'a str,
}

/// Validated prefix/suffix pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeFormat {
    prefix: String,
    suffix: String,
}

impl EnvelopeFormat {
    /// Build a format from explicit delimiters.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] if `suffix` is empty or if
    /// `prefix` contains `suffix`, either of which makes envelopes ambiguous.
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Result<Self, EncryptorError> {
        let prefix = prefix.into();
        let suffix = suffix.into();
        if suffix.is_empty() {
            return Err(EncryptorError::configuration("id suffix cannot be empty"));
        }
        if prefix.contains(suffix.as_str()) {
            return Err(EncryptorError::configuration(format!(
                "id prefix {prefix:?} cannot contain id suffix {suffix:?}"
            )));
        }
        Ok(Self { prefix, suffix })
    }

    /// The delimiter expected at index 0.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The delimiter closing the scheme id.
    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// Split `value` into scheme id and payload.
    ///
    /// Returns `None` when the prefix is not at index 0 or no suffix follows it.
    pub fn parse<'a>(&self, value: &'a str) -> Option<Envelope<'a>> {
        let rest = value.strip_prefix(self.prefix.as_str())?;
        let end = rest.find(self.suffix.as_str())?;
        Some(Envelope {
            scheme_id: &rest[..end],
            payload: &rest[end + self.suffix.len()..],
        })
    }

    /// Wrap cipher output with the scheme id.
    pub fn wrap(&self, scheme_id: &str, payload: &str) -> String {
        let mut out =
            String::with_capacity(self.prefix.len() + scheme_id.len() + self.suffix.len() + payload.len());
        out.push_str(&self.prefix);
        out.push_str(scheme_id);
        out.push_str(&self.suffix);
        out.push_str(payload);
        out
    }

    /// Check that `scheme_id` can round-trip through [`EnvelopeFormat::parse`].
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] if the id is empty or contains
    /// the (non-empty) prefix or the suffix.
    pub fn check_scheme_id(&self, scheme_id: &str) -> Result<(), EncryptorError> {
        if scheme_id.is_empty() {
            return Err(EncryptorError::configuration("scheme id cannot be empty"));
        }
        if !self.prefix.is_empty() && scheme_id.contains(self.prefix.as_str()) {
            return Err(EncryptorError::configuration(format!(
                "scheme id {scheme_id:?} cannot contain {:?}",
                self.prefix
            )));
        }
        if scheme_id.contains(self.suffix.as_str()) {
            return Err(EncryptorError::configuration(format!(
                "scheme id {scheme_id:?} cannot contain {:?}",
                self.suffix
            )));
        }
        Ok(())
    }
}

impl Default for EnvelopeFormat {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_ID_PREFIX.to_owned(),
            suffix: DEFAULT_ID_SUFFIX.to_owned(),
        }
    }
}
