//! Text ciphers: the per-scheme encrypt/decrypt primitives.
//!
//! Every AEAD scheme produces `base64url-no-pad(nonce || ciphertext+tag)` with a
//! fresh random nonce per call, so encrypting the same text twice yields two
//! different values that both decrypt to it.

use aes_gcm_siv::{
    aead::{generic_array::typenum::Unsigned, Aead, AeadCore, KeyInit, Nonce, OsRng},
    Aes256GcmSiv,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chacha20poly1305::XChaCha20Poly1305;
use common::CipherError;
use hkdf::Hkdf;
use sha2::Sha256;

/// Byte length of every derived key (256 bits).
pub const KEY_LEN: usize = 32;

/// Encrypt/decrypt capability of a single scheme.
///
/// `Debug` output must never include key material.
#[cfg_attr(test, mockall::automock)]
pub trait TextCipher: Send + Sync + std::fmt::Debug {
    /// Encrypt `plaintext` into a printable string.
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError>;

    /// Reverse [`TextCipher::encrypt`].
    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError>;
}

/// Identity cipher. Only useful for diagnostics.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCipher;

impl TextCipher for NoOpCipher {
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        Ok(plaintext.to_owned())
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        Ok(ciphertext.to_owned())
    }
}

/// Derive a [`KEY_LEN`]-byte key from a password and salt with HKDF-SHA256.
///
/// `info` separates schemes sharing the same password.
pub fn derive_key(password: &str, salt: &str, info: &[u8]) -> Result<[u8; KEY_LEN], CipherError> {
    let hk = Hkdf::<Sha256>::new(Some(salt.as_bytes()), password.as_bytes());
    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|_| CipherError::KeyDerivation)?;
    Ok(okm)
}

/// Text cipher over any AEAD algorithm.
pub struct AeadCipher<A> {
    algorithm: &'static str,
    cipher: A,
}

impl<A> AeadCipher<A>
where
    A: AeadCore + Aead + KeyInit,
{
    /// Build from raw key bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CipherError::InvalidKeyLength`] if the algorithm rejects the key.
    pub fn from_key(algorithm: &'static str, key: &[u8]) -> Result<Self, CipherError> {
        let cipher = A::new_from_slice(key).map_err(|_| CipherError::InvalidKeyLength)?;
        Ok(Self { algorithm, cipher })
    }

    /// Name of the underlying algorithm, for diagnostics.
    pub fn algorithm(&self) -> &'static str {
        self.algorithm
    }
}

impl AeadCipher<Aes256GcmSiv> {
    /// AES-256-GCM-SIV keyed from `password` and `salt`.
    pub fn aes_gcm_siv(password: &str, salt: &str, info: &[u8]) -> Result<Self, CipherError> {
        let key = derive_key(password, salt, info)?;
        Self::from_key("AES-256-GCM-SIV", &key)
    }
}

impl AeadCipher<XChaCha20Poly1305> {
    /// XChaCha20-Poly1305 keyed from `password` and `salt`.
    pub fn xchacha20_poly1305(password: &str, salt: &str, info: &[u8]) -> Result<Self, CipherError> {
        let key = derive_key(password, salt, info)?;
        Self::from_key("XChaCha20-Poly1305", &key)
    }
}

impl<A> TextCipher for AeadCipher<A>
where
    A: AeadCore + Aead + KeyInit + Send + Sync,
{
    fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce = A::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::AeadFailure)?;

        let mut raw = Vec::with_capacity(nonce.len() + ciphertext.len());
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let raw = URL_SAFE_NO_PAD
            .decode(ciphertext)
            .map_err(|_| CipherError::InvalidFormat)?;
        let nonce_len = <A as AeadCore>::NonceSize::USIZE;
        if raw.len() < nonce_len {
            return Err(CipherError::InvalidFormat);
        }
        let (nonce, body) = raw.split_at(nonce_len);
        let plaintext = self
            .cipher
            .decrypt(Nonce::<A>::from_slice(nonce), body)
            .map_err(|_| CipherError::AeadFailure)?;
        String::from_utf8(plaintext).map_err(|_| CipherError::InvalidUtf8)
    }
}

impl<A> std::fmt::Debug for AeadCipher<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of debug output.
        f.debug_struct("AeadCipher")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aes() -> AeadCipher<Aes256GcmSiv> {
        AeadCipher::aes_gcm_siv("pass", "8560b4f4b3", b"text").unwrap()
    }

    fn xchacha() -> AeadCipher<XChaCha20Poly1305> {
        AeadCipher::xchacha20_poly1305("pass", "8560b4f4b3", b"delux").unwrap()
    }

    #[test]
    fn noop_is_identity() {
        assert_eq!(NoOpCipher.encrypt("abc").unwrap(), "abc");
        assert_eq!(NoOpCipher.decrypt("abc").unwrap(), "abc");
    }

    #[test]
    fn aes_round_trip() {
        let c = aes();
        let encrypted = c.encrypt("test text!!!").unwrap();
        assert_ne!(encrypted, "test text!!!");
        assert_eq!(c.decrypt(&encrypted).unwrap(), "test text!!!");
    }

    #[test]
    fn xchacha_round_trip() {
        let c = xchacha();
        let encrypted = c.encrypt("비밀번호 secret").unwrap();
        assert_eq!(c.decrypt(&encrypted).unwrap(), "비밀번호 secret");
    }

    #[test]
    fn fresh_nonce_per_call() {
        let c = aes();
        assert_ne!(c.encrypt("same").unwrap(), c.encrypt("same").unwrap());
    }

    #[test]
    fn empty_plaintext_round_trip() {
        let c = aes();
        let encrypted = c.encrypt("").unwrap();
        assert_eq!(c.decrypt(&encrypted).unwrap(), "");
    }

    #[test]
    fn wrong_key_fails_decryption() {
        let other = AeadCipher::aes_gcm_siv("other", "8560b4f4b3", b"text").unwrap();
        let encrypted = aes().encrypt("secret").unwrap();
        assert!(matches!(other.decrypt(&encrypted), Err(CipherError::AeadFailure)));
    }

    #[test]
    fn schemes_do_not_share_keys() {
        let a = derive_key("pass", "salt", b"text").unwrap();
        let b = derive_key("pass", "salt", b"delux").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_bad_base64_and_short_input() {
        assert!(matches!(aes().decrypt("!!!"), Err(CipherError::InvalidFormat)));
        assert!(matches!(aes().decrypt("AAAA"), Err(CipherError::InvalidFormat)));
    }

    #[test]
    fn tampered_ciphertext_fails_auth() {
        let c = aes();
        let encrypted = c.encrypt("tamper me").unwrap();
        let mut raw = URL_SAFE_NO_PAD.decode(&encrypted).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        let tampered = URL_SAFE_NO_PAD.encode(raw);
        assert!(c.decrypt(&tampered).is_err());
    }

    #[test]
    fn ciphers_are_debuggable_as_trait_objects() {
        let ciphers: Vec<Box<dyn TextCipher>> =
            vec![Box::new(NoOpCipher), Box::new(aes()), Box::new(xchacha())];
        let rendered: Vec<String> = ciphers.iter().map(|c| format!("{c:?}")).collect();
        assert_eq!(rendered[0], "NoOpCipher");
        assert!(rendered[1].contains("AES-256-GCM-SIV"));
        assert!(rendered[2].contains("XChaCha20-Poly1305"));
    }

    #[test]
    fn debug_output_is_redacted() {
        let rendered = format!("{:?}", aes());
        assert!(rendered.contains("AES-256-GCM-SIV"));
        assert!(rendered.ends_with(".. }"));
    }
}
