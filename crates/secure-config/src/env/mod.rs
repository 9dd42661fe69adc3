//! Decryption pass over a configuration layer stack.
//!
//! 1. [`ConfigMerger`] walks the stack lowest to highest precedence and keeps
//!    the encrypted values that are not overridden by plain ones.
//! 2. [`ConfigDecryptor`] decrypts them, failing on the first bad value.
//! 3. [`DecryptedLayerInstaller`] installs the plaintext as the top layer.

pub mod decrypt;
pub mod installer;
pub mod merge;

pub use decrypt::{ConfigDecryptor, DecryptError};
pub use installer::{DecryptedLayerInstaller, DECRYPTED_LAYER_NAME};
pub use merge::{is_indexed_property, ConfigMerger};
