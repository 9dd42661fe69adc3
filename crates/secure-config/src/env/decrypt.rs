//! [`ConfigDecryptor`]: replace every encrypted value of a flat mapping with
//! its plaintext.

use common::EncryptorError;
use indexmap::IndexMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::crypto::MultiplexEncryptor;

/// Failure to decrypt one property. Aborts the whole pass.
#[derive(Debug, Error)]
pub enum DecryptError {
    /// The value under `key` carries an envelope its cipher rejected.
    #[error("cannot decrypt property {key}: {source}")]
    Property {
        /// Property that failed.
        key: String,
        #[source]
        source: EncryptorError,
    },
}

impl DecryptError {
    /// Key of the property that could not be decrypted.
    pub fn key(&self) -> &str {
        match self {
            DecryptError::Property { key, .. } => key,
        }
    }
}

/// Decrypts flat property mappings.
#[derive(Debug, Clone, Copy)]
pub struct ConfigDecryptor<'a> {
    encryptor: &'a MultiplexEncryptor,
}

impl<'a> ConfigDecryptor<'a> {
    /// Create a decryptor backed by `encryptor`.
    pub fn new(encryptor: &'a MultiplexEncryptor) -> Self {
        Self { encryptor }
    }

    /// Decrypt every encrypted value in place; keys and order are unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptError::Property`] for the first value that fails. No
    /// partially decrypted mapping is returned.
    pub fn decrypt(
        &self,
        mut properties: IndexMap<String, String>,
    ) -> Result<IndexMap<String, String>, DecryptError> {
        for (key, value) in properties.iter_mut() {
            if self.encryptor.is_encrypted(value) {
                *value = self.decrypt_value(key, value)?;
            }
        }
        Ok(properties)
    }

    /// Decrypt a single value, attributing any failure to `key`.
    pub fn decrypt_value(&self, key: &str, value: &str) -> Result<String, DecryptError> {
        match self.encryptor.decrypt(value) {
            Ok(plain) => {
                debug!(key, "decrypted property");
                Ok(plain)
            }
            Err(source) => {
                warn!(key, error = %source, "cannot decrypt property");
                Err(DecryptError::Property {
                    key: key.to_owned(),
                    source,
                })
            }
        }
    }
}
