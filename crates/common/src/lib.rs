//! Envelope format and error types shared across `secure-config` crates.

pub mod envelope;
pub mod error;

pub use envelope::{Envelope, EnvelopeFormat, DEFAULT_ID_PREFIX, DEFAULT_ID_SUFFIX};
pub use error::{CipherError, EncryptorError};
