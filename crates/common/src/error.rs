//! Error types shared by the cipher layer and the multiplexing encryptor.

use thiserror::Error;

/// Errors produced by a single cipher implementation.
#[derive(Debug, Error)]
pub enum CipherError {
    /// The password/salt pair could not be expanded into key material.
    #[error("key derivation failed")]
    KeyDerivation,

    /// The derived key does not fit the cipher.
    #[error("invalid key length")]
    InvalidKeyLength,

    /// AEAD encryption or decryption failed (wrong key or tampered data).
    #[error("aead operation failed")]
    AeadFailure,

    /// The ciphertext is not valid base64 or is too short to hold a nonce.
    #[error("invalid ciphertext format")]
    InvalidFormat,

    /// The decrypted bytes are not valid UTF-8.
    #[error("decrypted text is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors surfaced by the multiplexing encryptor.
///
/// - [`EncryptorError::Configuration`] is raised at construction time only.
/// - [`EncryptorError::UnknownScheme`] is raised when a caller names a scheme
///   explicitly. Unknown schemes found inside an envelope are *not* errors.
/// - [`EncryptorError::Encryption`] and [`EncryptorError::Decryption`] wrap a
///   cipher failure together with the scheme that raised it.
#[derive(Debug, Error)]
pub enum EncryptorError {
    /// Invalid construction parameters (delimiters, default scheme, scheme ids).
    #[error("invalid encryptor configuration: {0}")]
    Configuration(String),

    /// The requested scheme id is not registered.
    #[error("unknown encryption scheme: {0}")]
    UnknownScheme(String),

    /// The cipher could not encrypt the input.
    #[error("encryption with scheme {scheme} failed: {source}")]
    Encryption {
        /// Scheme whose cipher failed.
        scheme: String,
        #[source]
        source: CipherError,
    },

    /// The cipher rejected the ciphertext (wrong key or corrupted body).
    #[error("decryption with scheme {scheme} failed: {source}")]
    Decryption {
        /// Scheme whose cipher failed.
        scheme: String,
        #[source]
        source: CipherError,
    },
}

impl EncryptorError {
    /// Shorthand for a [`EncryptorError::Configuration`] error.
    pub fn configuration(message: impl Into<String>) -> Self {
        EncryptorError::Configuration(message.into())
    }
}
