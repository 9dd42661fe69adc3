//! [`EncryptorRegistry`]: builds and caches the shared [`MultiplexEncryptor`].
//!
//! # Lifecycle
//!
//! 1. The registry is constructed with [`Settings`] (explicitly, or once per
//!    process through [`EncryptorRegistry::global`]).
//! 2. The first [`EncryptorRegistry::get`] builds the default scheme set under a
//!    mutex; every later call returns the cached instance.
//! 3. `rebuild*` replaces the cached instance atomically. Callers holding the
//!    previous `Arc` keep using it until they drop it. Ordering `rebuild*`
//!    against in-flight decryption is the caller's responsibility.
//!
//! The default scheme set is keyed from sample values unless the settings
//! override them. It exists for diagnostics and must not protect real secrets.

use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwapOption;
use common::{EncryptorError, EnvelopeFormat};
use once_cell::sync::OnceCell;
use tracing::info;

use crate::crypto::scheme::SchemeEntry;
use crate::crypto::{
    AeadCipher, MultiplexEncryptor, NoOpCipher, SchemeCipher, SchemeMap, TextCipher,
};
use crate::settings::Settings;

/// Scheme id of the identity cipher.
pub const NOOP_SCHEME: &str = "noop";

/// Scheme id of the AES-256-GCM-SIV cipher.
pub const TEXT_SCHEME: &str = "text";

/// Scheme id of the XChaCha20-Poly1305 cipher.
pub const DELUX_SCHEME: &str = "delux";

static GLOBAL: OnceCell<EncryptorRegistry> = OnceCell::new();

/// Build the default scheme set (`noop`, `text`, `delux`) keyed from `settings`.
///
/// # Errors
///
/// Returns [`EncryptorError::Configuration`] if key derivation fails.
pub fn default_schemes(settings: &Settings) -> Result<SchemeMap, EncryptorError> {
    let text = AeadCipher::aes_gcm_siv(&settings.password, &settings.salt, TEXT_SCHEME.as_bytes())
        .map_err(|e| EncryptorError::configuration(format!("cannot build {TEXT_SCHEME}: {e}")))?;
    let delux =
        AeadCipher::xchacha20_poly1305(&settings.password, &settings.salt, DELUX_SCHEME.as_bytes())
            .map_err(|e| EncryptorError::configuration(format!("cannot build {DELUX_SCHEME}: {e}")))?;

    let mut schemes = SchemeMap::new();
    schemes.insert(NOOP_SCHEME.to_owned(), Arc::new(NoOpCipher));
    schemes.insert(TEXT_SCHEME.to_owned(), Arc::new(text));
    schemes.insert(DELUX_SCHEME.to_owned(), Arc::new(delux));
    Ok(schemes)
}

/// Holder of the shared [`MultiplexEncryptor`].
#[derive(Debug)]
pub struct EncryptorRegistry {
    settings: Settings,
    current: ArcSwapOption<MultiplexEncryptor>,
    init: Mutex<()>,
}

impl EncryptorRegistry {
    /// Create an empty registry; nothing is built until first use.
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            current: ArcSwapOption::empty(),
            init: Mutex::new(()),
        }
    }

    /// Process-wide registry, configured from the environment on first call.
    ///
    /// # Errors
    ///
    /// Returns an error if the `SECURE_CONFIG_*` settings are invalid. A failed
    /// attempt leaves the global uninitialised so a later call may retry.
    pub fn global() -> anyhow::Result<&'static EncryptorRegistry> {
        GLOBAL.get_or_try_init(|| Settings::from_env().map(Self::new))
    }

    /// Settings the default scheme set is built from.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Return the cached encryptor, building the default one on first use.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] if the settings do not yield
    /// a valid encryptor.
    pub fn get(&self) -> Result<Arc<MultiplexEncryptor>, EncryptorError> {
        if let Some(current) = self.current.load_full() {
            return Ok(current);
        }

        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have finished building while we waited.
        if let Some(current) = self.current.load_full() {
            return Ok(current);
        }
        let built = Arc::new(self.build_default()?);
        self.current.store(Some(Arc::clone(&built)));
        Ok(built)
    }

    /// Replace the cached encryptor with a fresh default build.
    pub fn rebuild(&self) -> Result<Arc<MultiplexEncryptor>, EncryptorError> {
        let built = self.build_default()?;
        Ok(self.install(built))
    }

    /// Replace the cached encryptor with one holding a single scheme, which
    /// also becomes the default.
    pub fn rebuild_with(
        &self,
        scheme_id: impl Into<String>,
        cipher: Arc<dyn TextCipher>,
    ) -> Result<Arc<MultiplexEncryptor>, EncryptorError> {
        let scheme_id = scheme_id.into();
        let mut schemes = SchemeMap::new();
        schemes.insert(scheme_id.clone(), cipher);
        self.rebuild_from(scheme_id, schemes)
    }

    /// Replace the cached encryptor with one built from an explicit scheme set.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] if the set is invalid; the
    /// previously cached encryptor is kept in that case.
    pub fn rebuild_from(
        &self,
        default_scheme: impl Into<String>,
        schemes: SchemeMap,
    ) -> Result<Arc<MultiplexEncryptor>, EncryptorError> {
        let built = MultiplexEncryptor::with_format(default_scheme, schemes, self.format()?)?;
        Ok(self.install(built))
    }

    /// Replace the cached encryptor with one holding `ciphers`, each under its
    /// own [`SchemeCipher::scheme_id`].
    ///
    /// The default is the cipher flagged [`SchemeCipher::is_default`], or
    /// [`Settings::default_scheme`] when none is flagged.
    ///
    /// # Errors
    ///
    /// Returns [`EncryptorError::Configuration`] if two ciphers share an id,
    /// more than one is flagged default, or the default is not among them.
    pub fn rebuild_from_ciphers<I>(
        &self,
        ciphers: I,
    ) -> Result<Arc<MultiplexEncryptor>, EncryptorError>
    where
        I: IntoIterator<Item = Arc<dyn SchemeCipher>>,
    {
        let mut schemes = SchemeMap::new();
        let mut defaults = Vec::new();
        for cipher in ciphers {
            let scheme_id = cipher.scheme_id().to_owned();
            if cipher.is_default() {
                defaults.push(scheme_id.clone());
            }
            if schemes.contains_key(&scheme_id) {
                return Err(EncryptorError::configuration(format!(
                    "scheme id {scheme_id:?} registered twice"
                )));
            }
            schemes.insert(scheme_id, Arc::new(SchemeEntry(cipher)));
        }

        let default_scheme = match defaults.as_slice() {
            [] => self.settings.default_scheme.clone(),
            [only] => only.clone(),
            many => {
                return Err(EncryptorError::configuration(format!(
                    "more than one default scheme: {many:?}"
                )))
            }
        };
        self.rebuild_from(default_scheme, schemes)
    }

    fn install(&self, built: MultiplexEncryptor) -> Arc<MultiplexEncryptor> {
        let built = Arc::new(built);
        let _guard = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        self.current.store(Some(Arc::clone(&built)));
        info!(
            default_scheme = built.default_scheme(),
            schemes = ?built.scheme_ids(),
            "encryptor registry rebuilt"
        );
        built
    }

    fn build_default(&self) -> Result<MultiplexEncryptor, EncryptorError> {
        let schemes = default_schemes(&self.settings)?;
        MultiplexEncryptor::with_format(self.settings.default_scheme.clone(), schemes, self.format()?)
    }

    fn format(&self) -> Result<EnvelopeFormat, EncryptorError> {
        EnvelopeFormat::new(self.settings.id_prefix.clone(), self.settings.id_suffix.clone())
    }
}

impl Default for EncryptorRegistry {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
