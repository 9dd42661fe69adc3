//! [`DecryptedLayerInstaller`]: decrypt a layer stack and expose the plaintext
//! as its highest-precedence layer.

use std::sync::Arc;

use common::EncryptorError;
use tracing::{debug, info};

use super::decrypt::{ConfigDecryptor, DecryptError};
use super::merge::ConfigMerger;
use crate::crypto::MultiplexEncryptor;
use crate::layer::{LayerStack, PropertyLayer};
use crate::registry::EncryptorRegistry;

/// Name of the installed layer. Reinstalling replaces it.
pub const DECRYPTED_LAYER_NAME: &str = "secureConfigDecrypted";

/// Runs merge + decrypt over a [`LayerStack`] and installs the result.
#[derive(Debug, Clone)]
pub struct DecryptedLayerInstaller {
    encryptor: Arc<MultiplexEncryptor>,
}

impl DecryptedLayerInstaller {
    /// Create an installer using `encryptor`.
    pub fn new(encryptor: Arc<MultiplexEncryptor>) -> Self {
        Self { encryptor }
    }

    /// Create an installer using the registry's current encryptor.
    pub fn from_registry(registry: &EncryptorRegistry) -> Result<Self, EncryptorError> {
        Ok(Self::new(registry.get()?))
    }

    /// Decrypt `stack` and install the plaintext as its top layer.
    ///
    /// Any previously installed decrypted layer is removed first. Returns
    /// `true` if a layer was installed, `false` when there was nothing to
    /// decrypt.
    ///
    /// # Errors
    ///
    /// Returns [`DecryptError`] naming the first property that could not be
    /// decrypted; the stack is left without a decrypted layer in that case.
    pub fn install(&self, stack: &mut LayerStack) -> Result<bool, DecryptError> {
        if self.encryptor.is_empty() {
            debug!("no encryption schemes registered; skipping decryption");
            return Ok(false);
        }

        stack.remove(DECRYPTED_LAYER_NAME);

        let merged = ConfigMerger::new(&self.encryptor).merge(stack);
        let decrypted = ConfigDecryptor::new(&self.encryptor).decrypt(merged)?;
        if decrypted.is_empty() {
            debug!("no encrypted properties found");
            return Ok(false);
        }

        info!(properties = decrypted.len(), "installing decrypted configuration layer");
        stack.push(PropertyLayer::from_entries(DECRYPTED_LAYER_NAME, decrypted));
        Ok(true)
    }
}
