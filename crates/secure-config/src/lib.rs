//! Encrypted configuration values with several concurrently registered schemes.
//!
//! Values are stored as `{scheme-id}cipher-output`. A [`MultiplexEncryptor`]
//! picks the cipher named by that id, and the [`env`] pass decrypts a whole
//! stack of configuration layers at load time, installing the plaintext as a
//! new top layer.
//!
//! ```no_run
//! use secure_config::{DecryptedLayerInstaller, EncryptorRegistry, LayerStack, PropertyLayer};
//!
//! # fn main() -> anyhow::Result<()> {
//! let registry = EncryptorRegistry::global()?;
//! let encrypted = registry.get()?.encrypt("s3cret")?;
//!
//! let mut stack = LayerStack::new();
//! stack.push(PropertyLayer::new("application").with("db.password", encrypted));
//! DecryptedLayerInstaller::from_registry(registry)?.install(&mut stack)?;
//!
//! let cfg = stack.build_config()?;
//! assert_eq!(cfg.get_string("db.password")?, "s3cret");
//! # Ok(())
//! # }
//! ```

pub mod crypto;
pub mod env;
pub mod layer;
pub mod registry;
pub mod settings;
pub mod source;
pub mod telemetry;

pub use common::{CipherError, EncryptorError, Envelope, EnvelopeFormat};
pub use crypto::{
    AeadCipher, MultiplexEncryptor, NamedCipher, NoOpCipher, SchemeCipher, SchemeMap, TextCipher,
};
pub use env::{ConfigDecryptor, ConfigMerger, DecryptError, DecryptedLayerInstaller};
pub use layer::{CompositeLayer, Layer, LayerStack, PropertyLayer};
pub use registry::EncryptorRegistry;
pub use settings::Settings;
pub use source::{DecryptingSourceFactory, SourceError};
