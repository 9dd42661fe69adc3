//! [`ConfigMerger`]: collapse a layer stack into the encrypted properties that
//! still win after precedence is applied.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::crypto::MultiplexEncryptor;
use crate::layer::{Layer, LayerStack, PropertyLayer};

/// `name[idx]` or `name[idx].rest`, matched against the whole key.
///
/// Whitespace and digits are the ASCII sets only: `\u{a0}` counts as part of a
/// name and `[٣]` is not an index.
static INDEXED_PROPERTY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([^ \t\n\x0B\x0C\r]+)?\[([0-9]+)\](\.[^ \t\n\x0B\x0C\r]+)?$")
        .expect("indexed property pattern is valid")
});

/// `true` if `key` addresses one element of a list-valued property.
pub fn is_indexed_property(key: &str) -> bool {
    INDEXED_PROPERTY.is_match(key)
}

/// Merges layers lowest to highest precedence into one flat mapping.
///
/// Rules per flat layer:
/// - an encrypted value is written (a later layer overwrites it);
/// - a plain value at an ordinary key removes any encrypted value recorded by a
///   lower layer, so the plain override wins;
/// - plain indexed values are staged and written only if the same layer also
///   holds an encrypted indexed value, so list elements next to an encrypted
///   one are kept together.
#[derive(Debug, Clone, Copy)]
pub struct ConfigMerger<'a> {
    encryptor: &'a MultiplexEncryptor,
}

impl<'a> ConfigMerger<'a> {
    /// Create a merger that detects envelopes with `encryptor`.
    pub fn new(encryptor: &'a MultiplexEncryptor) -> Self {
        Self { encryptor }
    }

    /// Merge every layer of `stack`.
    pub fn merge(&self, stack: &LayerStack) -> IndexMap<String, String> {
        self.merge_layers(stack.layers())
    }

    /// Merge `layers`, given lowest precedence first.
    pub fn merge_layers(&self, layers: &[Layer]) -> IndexMap<String, String> {
        let mut properties = IndexMap::new();
        for layer in layers {
            self.merge_layer(layer, &mut properties);
        }
        properties
    }

    fn merge_layer(&self, layer: &Layer, properties: &mut IndexMap<String, String>) {
        match layer {
            Layer::Composite(composite) => {
                for nested in composite.children() {
                    self.merge_layer(nested, properties);
                }
            }
            Layer::Properties(layer) => self.merge_properties(layer, properties),
        }
    }

    fn merge_properties(&self, layer: &PropertyLayer, properties: &mut IndexMap<String, String>) {
        let mut staged_indexed: Vec<(&str, &str)> = Vec::new();
        let mut has_encrypted_indexed = false;

        for (key, value) in layer.entries() {
            if self.encryptor.is_encrypted(value) {
                properties.insert(key.clone(), value.clone());
                if is_indexed_property(key) {
                    has_encrypted_indexed = true;
                }
            } else if is_indexed_property(key) {
                staged_indexed.push((key, value));
            } else {
                properties.shift_remove(key.as_str());
            }
        }

        if has_encrypted_indexed {
            for (key, value) in staged_indexed {
                properties.insert(key.to_owned(), value.to_owned());
            }
        }

        debug!(
            layer = layer.name(),
            entries = layer.len(),
            merged = properties.len(),
            "merged configuration layer"
        );
    }
}
