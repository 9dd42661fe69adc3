//! Load a configuration file and decrypt its values as it is read.
//!
//! Unlike [`crate::env::DecryptedLayerInstaller`], which decrypts a whole stack
//! after the fact, this produces a single layer whose values are already
//! plaintext.

use std::path::Path;
use std::sync::Arc;

use config::{ConfigError, File, FileFormat};
use thiserror::Error;
use tracing::info;

use crate::crypto::MultiplexEncryptor;
use crate::env::{ConfigDecryptor, DecryptError};
use crate::layer::PropertyLayer;

/// Errors from loading a decrypting source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The file could not be read or parsed.
    #[error("failed to load configuration source {name}: {source}")]
    Load {
        /// Name of the source.
        name: String,
        #[source]
        source: ConfigError,
    },

    /// A value could not be decrypted.
    #[error(transparent)]
    Decrypt(#[from] DecryptError),
}

/// Builds plaintext [`PropertyLayer`]s from encrypted configuration files.
#[derive(Debug, Clone)]
pub struct DecryptingSourceFactory {
    encryptor: Arc<MultiplexEncryptor>,
}

impl DecryptingSourceFactory {
    /// Create a factory using `encryptor`.
    pub fn new(encryptor: Arc<MultiplexEncryptor>) -> Self {
        Self { encryptor }
    }

    /// Load `path` (format inferred from its extension), naming the layer
    /// after the path.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<PropertyLayer, SourceError> {
        self.load_named(None, path)
    }

    /// Load `path` under an explicit layer name, or the path when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Load`] if the file is missing or malformed and
    /// [`SourceError::Decrypt`] if an encrypted value cannot be decrypted.
    pub fn load_named(
        &self,
        name: Option<&str>,
        path: impl AsRef<Path>,
    ) -> Result<PropertyLayer, SourceError> {
        let path = path.as_ref();
        let name = name
            .map(str::to_owned)
            .unwrap_or_else(|| path.display().to_string());
        let layer = PropertyLayer::from_source(name.clone(), &File::from(path))
            .map_err(|source| SourceError::Load { name, source })?;
        self.decrypt_layer(layer)
    }

    /// Parse `text` in `format` and decrypt it.
    pub fn load_str(
        &self,
        name: &str,
        text: &str,
        format: FileFormat,
    ) -> Result<PropertyLayer, SourceError> {
        let layer = PropertyLayer::from_source(name, &File::from_str(text, format)).map_err(
            |source| SourceError::Load {
                name: name.to_owned(),
                source,
            },
        )?;
        self.decrypt_layer(layer)
    }

    fn decrypt_layer(&self, layer: PropertyLayer) -> Result<PropertyLayer, SourceError> {
        let decryptor = ConfigDecryptor::new(&self.encryptor);
        let mut decrypted = PropertyLayer::new(layer.name());
        let mut count = 0usize;
        for (key, value) in layer.entries() {
            if self.encryptor.is_encrypted(value) {
                decrypted.insert(key.clone(), decryptor.decrypt_value(key, value)?);
                count += 1;
            } else {
                decrypted.insert(key.clone(), value.clone());
            }
        }
        info!(source = layer.name(), decrypted = count, "loaded decrypting source");
        Ok(decrypted)
    }
}
