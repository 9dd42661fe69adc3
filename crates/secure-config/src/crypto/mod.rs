//! Ciphers and the multiplexing encryptor that selects between them.
//!
//! This module is free of any configuration-layer logic.
//!
//! # Envelope format
//!
//! ```text
//! {<scheme-id>}<cipher-output>
//! ```
//!
//! The delimiters are configurable; see [`common::EnvelopeFormat`].

pub mod cipher;
pub mod multiplex;
pub mod scheme;

pub use cipher::{AeadCipher, NoOpCipher, TextCipher, KEY_LEN};
pub use multiplex::{MultiplexEncryptor, SchemeMap};
pub use scheme::{NamedCipher, SchemeCipher};
