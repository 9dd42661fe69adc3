//! Ciphers that carry their own scheme id, for plug-in registration through
//! [`crate::registry::EncryptorRegistry::rebuild_from_ciphers`].

use std::sync::Arc;

use common::CipherError;

use super::cipher::TextCipher;

/// A [`TextCipher`] that knows the scheme id it is registered under.
pub trait SchemeCipher: TextCipher {
    /// Id written between the envelope delimiters.
    fn scheme_id(&self) -> &str;

    /// `true` if this scheme should be the default for plain `encrypt` calls.
    fn is_default(&self) -> bool {
        false
    }
}

/// Attach a scheme id (and optionally the default flag) to any [`TextCipher`].
#[derive(Debug, Clone)]
pub struct NamedCipher<C> {
    scheme_id: String,
    default: bool,
    cipher: C,
}

impl<C: TextCipher> NamedCipher<C> {
    pub fn new(scheme_id: impl Into<String>, cipher: C) -> Self {
        Self {
            scheme_id: scheme_id.into(),
            default: false,
            cipher,
        }
    }

    /// Mark this scheme as the default.
    pub fn as_default(mut self) -> Self {
        self.default = true;
        self
    }
}

impl<C: TextCipher> TextCipher for NamedCipher<C> {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        self.cipher.encrypt(plaintext)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        self.cipher.decrypt(ciphertext)
    }
}

impl<C: TextCipher> SchemeCipher for NamedCipher<C> {
    fn scheme_id(&self) -> &str {
        &self.scheme_id
    }

    fn is_default(&self) -> bool {
        self.default
    }
}

/// Registers a shared [`SchemeCipher`] where a plain [`TextCipher`] is expected.
#[derive(Debug)]
pub(crate) struct SchemeEntry(pub(crate) Arc<dyn SchemeCipher>);

impl TextCipher for SchemeEntry {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        self.0.encrypt(plaintext)
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        self.0.decrypt(ciphertext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::cipher::{MockTextCipher, NoOpCipher};

    #[test]
    fn named_cipher_delegates() {
        let mut mock = MockTextCipher::new();
        mock.expect_encrypt().returning(|p| Ok(format!("enc:{p}")));
        mock.expect_decrypt().returning(|c| Ok(c.trim_start_matches("enc:").to_owned()));

        let named = NamedCipher::new("mock", mock);
        assert_eq!(named.scheme_id(), "mock");
        assert!(!named.is_default());
        assert_eq!(named.encrypt("x").unwrap(), "enc:x");
        assert_eq!(named.decrypt("enc:x").unwrap(), "x");
    }

    #[test]
    fn as_default_sets_flag() {
        assert!(NamedCipher::new("noop", NoOpCipher).as_default().is_default());
    }

    #[test]
    fn entry_forwards_to_shared_cipher() {
        let shared: Arc<dyn SchemeCipher> = Arc::new(NamedCipher::new("noop", NoOpCipher));
        let entry = SchemeEntry(Arc::clone(&shared));
        assert_eq!(entry.decrypt("abc").unwrap(), "abc");
        assert!(format!("{entry:?}").contains("noop"));
    }
}
