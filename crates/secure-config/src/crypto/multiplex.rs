//! [`MultiplexEncryptor`]: select-by-id encryption over several registered schemes.

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    sync::Arc,
};

use arc_swap::ArcSwap;
use common::{EncryptorError, EnvelopeFormat};
use tracing::debug;

use super::cipher::TextCipher;

/// Scheme id → cipher dispatch table.
pub type SchemeMap = HashMap<String, Arc<dyn TextCipher>>;

/// Encrypts with a default scheme and decrypts whatever registered scheme a
/// value's envelope names.
///
/// Values without an envelope, or whose envelope names an unregistered scheme,
/// are not considered encrypted: [`MultiplexEncryptor::decrypt`] returns them
/// unchanged so foreign or plain values can coexist with encrypted ones.
///
/// The dispatch table is swapped atomically on late registration, so readers
/// always see a complete table.
pub struct MultiplexEncryptor {
    format: EnvelopeFormat,
    default_scheme: String,
    schemes: ArcSwap<SchemeMap>,
}

impl MultiplexEncryptor {
    /// Build with the default `{` / `}` delimiters.
    ///
    /// # Errors
    ///
    /// See [`MultiplexEncryptor::with_format`].
    pub fn new(default_scheme: impl Into<String>, schemes: SchemeMap) -> Result<Self, EncryptorError> {
        Self::with_format(default_scheme, schemes, EnvelopeFormat::default())
    }

    /// Build with explicit envelope delimiters.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] for an empty suffix, a prefix
    /// containing the suffix, or any of the failures of
    /// [`MultiplexEncryptor::with_format`].
    pub fn with_delimiters(
        default_scheme: impl Into<String>,
        schemes: SchemeMap,
        prefix: &str,
        suffix: &str,
    ) -> Result<Self, EncryptorError> {
        let format = EnvelopeFormat::new(prefix, suffix)?;
        Self::with_format(default_scheme, schemes, format)
    }

    /// Build with an already validated [`EnvelopeFormat`].
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] if `default_scheme` is not a
    /// key of `schemes`, or if any scheme id is empty or contains a delimiter.
    pub fn with_format(
        default_scheme: impl Into<String>,
        schemes: SchemeMap,
        format: EnvelopeFormat,
    ) -> Result<Self, EncryptorError> {
        let default_scheme = default_scheme.into();
        if !schemes.contains_key(&default_scheme) {
            return Err(EncryptorError::configuration(format!(
                "default scheme {default_scheme:?} is not registered (registered: {:?})",
                sorted_ids(&schemes)
            )));
        }
        for id in schemes.keys() {
            format.check_scheme_id(id)?;
        }

        Ok(Self {
            format,
            default_scheme,
            schemes: ArcSwap::from_pointee(schemes),
        })
    }

    /// Encrypt with the default scheme.
    pub fn encrypt(&self, text: &str) -> Result<String, EncryptorError> {
        self.encrypt_with(&self.default_scheme, text)
    }

    /// Encrypt with an explicit scheme and wrap the output in its envelope.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::UnknownScheme`] if `scheme_id` is not
    /// registered, or [`EncryptorError::Encryption`] if the cipher fails.
    pub fn encrypt_with(&self, scheme_id: &str, text: &str) -> Result<String, EncryptorError> {
        let cipher = self.encryptor(scheme_id)?;
        let payload = cipher
            .encrypt(text)
            .map_err(|source| EncryptorError::Encryption {
                scheme: scheme_id.to_owned(),
                source,
            })?;
        Ok(self.format.wrap(scheme_id, &payload))
    }

    /// Decrypt `value` with the scheme named by its envelope.
    ///
    /// Returns `value` unchanged when it carries no envelope or names a scheme
    /// that is not registered.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Decryption`] if the selected cipher rejects
    /// the payload.
    pub fn decrypt(&self, value: &str) -> Result<String, EncryptorError> {
        let Some(envelope) = self.format.parse(value) else {
            return Ok(value.to_owned());
        };
        let schemes = self.schemes.load();
        let Some(cipher) = schemes.get(envelope.scheme_id) else {
            debug!(scheme = envelope.scheme_id, "scheme not registered; value left as is");
            return Ok(value.to_owned());
        };
        cipher
            .decrypt(envelope.payload)
            .map_err(|source| EncryptorError::Decryption {
                scheme: envelope.scheme_id.to_owned(),
                source,
            })
    }

    /// `true` iff `value` starts with an envelope naming a registered scheme.
    pub fn is_encrypted(&self, value: &str) -> bool {
        self.format
            .parse(value)
            .is_some_and(|envelope| self.contains_scheme(envelope.scheme_id))
    }

    /// Direct access to a registered cipher.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::UnknownScheme`] if `scheme_id` is absent.
    pub fn encryptor(&self, scheme_id: &str) -> Result<Arc<dyn TextCipher>, EncryptorError> {
        self.schemes
            .load()
            .get(scheme_id)
            .cloned()
            .ok_or_else(|| EncryptorError::UnknownScheme(scheme_id.to_owned()))
    }

    /// Register one more scheme, replacing any cipher under the same id.
    ///
    /// The id is not validated against the envelope delimiters.
    pub fn add_scheme(&self, scheme_id: impl Into<String>, cipher: Arc<dyn TextCipher>) -> &Self {
        let scheme_id = scheme_id.into();
        self.schemes.rcu(|current| {
            let mut next = SchemeMap::clone(current);
            next.insert(scheme_id.clone(), Arc::clone(&cipher));
            next
        });
        self
    }

    /// Register several schemes at once. See [`MultiplexEncryptor::add_scheme`].
    pub fn add_schemes<I>(&self, schemes: I) -> &Self
    where
        I: IntoIterator<Item = (String, Arc<dyn TextCipher>)>,
    {
        let added: Vec<_> = schemes.into_iter().collect();
        self.schemes.rcu(|current| {
            let mut next = SchemeMap::clone(current);
            next.extend(added.iter().map(|(id, cipher)| (id.clone(), Arc::clone(cipher))));
            next
        });
        self
    }

    /// Scheme used by [`MultiplexEncryptor::encrypt`].
    pub fn default_scheme(&self) -> &str {
        &self.default_scheme
    }

    /// Envelope delimiters in use.
    pub fn format(&self) -> &EnvelopeFormat {
        &self.format
    }

    /// Whether `scheme_id` is registered.
    pub fn contains_scheme(&self, scheme_id: &str) -> bool {
        self.schemes.load().contains_key(scheme_id)
    }

    /// Registered scheme ids, sorted.
    pub fn scheme_ids(&self) -> Vec<String> {
        sorted_ids(&self.schemes.load())
    }

    /// `true` if no scheme is registered.
    pub fn is_empty(&self) -> bool {
        self.schemes.load().is_empty()
    }
}

impl fmt::Debug for MultiplexEncryptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let schemes = self.schemes.load();
        let sorted: BTreeMap<&String, &Arc<dyn TextCipher>> = schemes.iter().collect();
        f.debug_struct("MultiplexEncryptor")
            .field("format", &self.format)
            .field("default_scheme", &self.default_scheme)
            .field("schemes", &sorted)
            .finish()
    }
}

fn sorted_ids(schemes: &SchemeMap) -> Vec<String> {
    let mut ids: Vec<String> = schemes.keys().cloned().collect();
    ids.sort();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::cipher::{AeadCipher, MockTextCipher, NoOpCipher};
    use common::CipherError;

    fn real_schemes() -> SchemeMap {
        let mut schemes = SchemeMap::new();
        schemes.insert(
            "text".into(),
            Arc::new(AeadCipher::aes_gcm_siv("pass", "8560b4f4b3", b"text").unwrap()),
        );
        schemes.insert(
            "delux".into(),
            Arc::new(AeadCipher::xchacha20_poly1305("pass", "8560b4f4b3", b"delux").unwrap()),
        );
        schemes.insert("noop".into(), Arc::new(NoOpCipher));
        schemes
    }

    fn fixed_cipher(encrypted: &'static str, plain: &'static str) -> MockTextCipher {
        let mut mock = MockTextCipher::new();
        mock.expect_encrypt()
            .returning(move |_| Ok(encrypted.to_owned()));
        mock.expect_decrypt()
            .returning(move |_| Ok(plain.to_owned()));
        mock
    }

    #[test]
    fn round_trip_every_scheme() {
        let enc = MultiplexEncryptor::new("text", real_schemes()).unwrap();
        for id in enc.scheme_ids() {
            for text in ["", "secret", "p@ss{word}", "한글 텍스트"] {
                let encrypted = enc.encrypt_with(&id, text).unwrap();
                assert!(encrypted.starts_with(&format!("{{{id}}}")));
                assert_eq!(enc.decrypt(&encrypted).unwrap(), text);
            }
        }
    }

    #[test]
    fn default_scheme_tags_envelope() {
        let mut schemes = SchemeMap::new();
        schemes.insert("text".into(), Arc::new(fixed_cipher("CIPHER-A", "secret")));
        schemes.insert("delux".into(), Arc::new(fixed_cipher("CIPHER-B", "other")));
        let enc = MultiplexEncryptor::new("text", schemes).unwrap();

        let encrypted = enc.encrypt("secret").unwrap();
        assert_eq!(encrypted, "{text}CIPHER-A");
        assert_eq!(enc.decrypt(&encrypted).unwrap(), "secret");
        assert_eq!(enc.decrypt("plainvalue").unwrap(), "plainvalue");
        assert!(!enc.is_encrypted("plainvalue"));
    }

    #[test]
    fn dispatches_on_embedded_scheme() {
        let mut delux = MockTextCipher::new();
        delux
            .expect_decrypt()
            .withf(|payload| payload == "body")
            .times(1)
            .returning(|_| Ok("from-delux".into()));
        let mut text = MockTextCipher::new();
        text.expect_decrypt().never();

        let mut schemes = SchemeMap::new();
        schemes.insert("text".into(), Arc::new(text));
        schemes.insert("delux".into(), Arc::new(delux));
        let enc = MultiplexEncryptor::new("text", schemes).unwrap();

        assert_eq!(enc.decrypt("{delux}body").unwrap(), "from-delux");
    }

    #[test]
    fn unknown_scheme_passes_through() {
        let enc = MultiplexEncryptor::new("text", real_schemes()).unwrap();
        let foreign = "{cipher}abcdef";
        assert!(!enc.is_encrypted(foreign));
        assert_eq!(enc.decrypt(foreign).unwrap(), foreign);
    }

    #[test]
    fn values_without_envelope_pass_through() {
        let enc = MultiplexEncryptor::new("text", real_schemes()).unwrap();
        for v in ["", "plain", " {text}x", "{text", "a{text}b"] {
            assert!(!enc.is_encrypted(v));
            assert_eq!(enc.decrypt(v).unwrap(), v);
        }
    }

    #[test]
    fn cipher_failure_is_decryption_error() {
        let mut failing = MockTextCipher::new();
        failing
            .expect_decrypt()
            .returning(|_| Err(CipherError::AeadFailure));
        let mut schemes = SchemeMap::new();
        schemes.insert("text".into(), Arc::new(failing));
        let enc = MultiplexEncryptor::new("text", schemes).unwrap();

        let err = enc.decrypt("{text}garbage").unwrap_err();
        assert!(matches!(err, EncryptorError::Decryption { ref scheme, .. } if scheme == "text"));
    }

    #[test]
    fn corrupted_real_ciphertext_fails() {
        let enc = MultiplexEncryptor::new("text", real_schemes()).unwrap();
        assert!(matches!(
            enc.decrypt("{text}not-base64!!"),
            Err(EncryptorError::Decryption { .. })
        ));
    }

    #[test]
    fn explicit_unknown_scheme_is_error() {
        let enc = MultiplexEncryptor::new("text", real_schemes()).unwrap();
        assert!(matches!(
            enc.encrypt_with("missing", "x"),
            Err(EncryptorError::UnknownScheme(_))
        ));
        assert!(matches!(
            enc.encryptor("missing"),
            Err(EncryptorError::UnknownScheme(_))
        ));
        assert!(enc.encryptor("noop").is_ok());
    }

    #[test]
    fn rejects_unregistered_default() {
        let err = MultiplexEncryptor::new("missing", real_schemes()).unwrap_err();
        assert!(matches!(err, EncryptorError::Configuration(_)));
    }

    #[test]
    fn rejects_ids_containing_delimiters() {
        let mut schemes = real_schemes();
        schemes.insert("a{b".into(), Arc::new(NoOpCipher));
        assert!(matches!(
            MultiplexEncryptor::new("text", schemes),
            Err(EncryptorError::Configuration(_))
        ));

        let mut schemes = real_schemes();
        schemes.insert("a}b".into(), Arc::new(NoOpCipher));
        assert!(MultiplexEncryptor::new("text", schemes).is_err());
    }

    #[test]
    fn rejects_bad_delimiters() {
        assert!(MultiplexEncryptor::with_delimiters("text", real_schemes(), "{", "").is_err());
        assert!(MultiplexEncryptor::with_delimiters("text", real_schemes(), "[[", "[").is_err());
    }

    #[test]
    fn custom_delimiters_round_trip() {
        let enc =
            MultiplexEncryptor::with_delimiters("text", real_schemes(), "ENC(", ")").unwrap();
        let encrypted = enc.encrypt("secret").unwrap();
        assert!(encrypted.starts_with("ENC(text)"));
        assert!(enc.is_encrypted(&encrypted));
        assert!(!enc.is_encrypted("{text}abc"));
        assert_eq!(enc.decrypt(&encrypted).unwrap(), "secret");
    }

    #[test]
    fn late_registration_is_visible() {
        let mut schemes = SchemeMap::new();
        schemes.insert("noop".into(), Arc::new(NoOpCipher) as Arc<dyn TextCipher>);
        let enc = MultiplexEncryptor::new("noop", schemes).unwrap();
        assert!(!enc.is_encrypted("{late}x"));

        enc.add_scheme("late", Arc::new(fixed_cipher("L", "late-plain")))
            .add_schemes(vec![(
                "later".to_owned(),
                Arc::new(NoOpCipher) as Arc<dyn TextCipher>,
            )]);

        assert!(enc.is_encrypted("{late}x"));
        assert_eq!(enc.decrypt("{late}x").unwrap(), "late-plain");
        assert_eq!(enc.decrypt("{later}kept").unwrap(), "kept");
        assert_eq!(enc.scheme_ids(), vec!["late", "later", "noop"]);
    }

    #[test]
    fn late_registration_skips_id_validation() {
        let enc = MultiplexEncryptor::new("text", real_schemes()).unwrap();
        enc.add_scheme("odd}id", Arc::new(NoOpCipher));
        assert!(enc.contains_scheme("odd}id"));
    }

    #[test]
    fn debug_lists_redacted_ciphers() {
        let enc = MultiplexEncryptor::new("text", real_schemes()).unwrap();
        let rendered = format!("{enc:?}");
        assert!(rendered.contains("\"delux\": AeadCipher { algorithm: \"XChaCha20-Poly1305\", .. }"));
        assert!(rendered.contains("\"noop\": NoOpCipher"));
        assert!(!rendered.contains("pass"));
    }
}
