//! Layered configuration sources.
//!
//! A [`LayerStack`] holds [`Layer`]s ordered from lowest to highest precedence.
//! A layer is either a flat [`PropertyLayer`] of string keys and values, or a
//! [`CompositeLayer`] of nested layers (also lowest to highest).
//!
//! Keys follow the flattened property convention: nested tables are joined
//! with `.` and array elements are written `name[index]`, e.g.
//! `servers[1].password`.

use config::{ConfigError, Map, Source, Value, ValueKind};

/// One flat configuration source with insertion-ordered entries.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PropertyLayer {
    name: String,
    entries: Vec<(String, String)>,
}

impl PropertyLayer {
    /// Create an empty layer.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Create a layer from key/value pairs, keeping their order.
    pub fn from_entries<I, K, V>(name: impl Into<String>, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut layer = Self::new(name);
        for (key, value) in entries {
            layer.insert(key, value);
        }
        layer
    }

    /// Flatten a `config` crate source into a layer.
    ///
    /// Nested tables become dotted keys, arrays become indexed keys, scalars are
    /// rendered as strings and nulls are dropped.
    ///
    /// # Errors
    ///
    /// Returns the source's own error if it cannot be collected.
    pub fn from_source<S>(name: impl Into<String>, source: &S) -> Result<Self, ConfigError>
    where
        S: Source + ?Sized,
    {
        let mut layer = Self::new(name);
        for (key, value) in source.collect()? {
            flatten_into(&key, &value, &mut layer.entries);
        }
        Ok(layer)
    }

    /// Builder-style [`PropertyLayer::insert`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, replacing an existing value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Layer name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value for `key`, if present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Entries in insertion order.
    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the layer has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn flatten_into(key: &str, value: &Value, out: &mut Vec<(String, String)>) {
    match &value.kind {
        ValueKind::Nil => {}
        ValueKind::Table(table) => {
            for (child, v) in table {
                flatten_into(&format!("{key}.{child}"), v, out);
            }
        }
        ValueKind::Array(items) => {
            for (index, v) in items.iter().enumerate() {
                flatten_into(&format!("{key}[{index}]"), v, out);
            }
        }
        scalar => out.push((key.to_owned(), scalar.to_string())),
    }
}

impl std::fmt::Debug for PropertyLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Values may be decrypted secrets; list keys only.
        let keys: Vec<&str> = self.entries.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("PropertyLayer")
            .field("name", &self.name)
            .field("keys", &keys)
            .finish()
    }
}

impl Source for PropertyLayer {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new(self.clone())
    }

    fn collect(&self) -> Result<Map<String, Value>, ConfigError> {
        let mut map = Map::new();
        for (key, value) in &self.entries {
            map.insert(key.clone(), Value::new(Some(&self.name), value.clone()));
        }
        Ok(map)
    }
}

/// A named group of nested layers, ordered lowest to highest precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositeLayer {
    name: String,
    children: Vec<Layer>,
}

impl CompositeLayer {
    /// Create an empty composite.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }

    /// Append `layer` as the new highest-precedence child.
    pub fn with(mut self, layer: impl Into<Layer>) -> Self {
        self.children.push(layer.into());
        self
    }

    /// Composite name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Children, lowest precedence first.
    pub fn children(&self) -> &[Layer] {
        &self.children
    }
}

/// One entry of a [`LayerStack`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Layer {
    /// Flat key/value source.
    Properties(PropertyLayer),
    /// Nested group of layers.
    Composite(CompositeLayer),
}

impl Layer {
    /// Name of the layer.
    pub fn name(&self) -> &str {
        match self {
            Layer::Properties(layer) => layer.name(),
            Layer::Composite(layer) => layer.name(),
        }
    }

    fn collect_properties<'a>(&'a self, out: &mut Vec<&'a PropertyLayer>) {
        match self {
            Layer::Properties(layer) => out.push(layer),
            Layer::Composite(composite) => {
                for child in &composite.children {
                    child.collect_properties(out);
                }
            }
        }
    }
}

impl From<PropertyLayer> for Layer {
    fn from(layer: PropertyLayer) -> Self {
        Layer::Properties(layer)
    }
}

impl From<CompositeLayer> for Layer {
    fn from(layer: CompositeLayer) -> Self {
        Layer::Composite(layer)
    }
}

/// Ordered stack of layers; the last layer has the highest precedence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerStack {
    layers: Vec<Layer>,
}

impl LayerStack {
    /// Create an empty stack.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `layer` above every existing layer.
    pub fn push(&mut self, layer: impl Into<Layer>) -> &mut Self {
        self.layers.push(layer.into());
        self
    }

    /// Remove the first layer named `name`, returning it.
    pub fn remove(&mut self, name: &str) -> Option<Layer> {
        let index = self.layers.iter().position(|l| l.name() == name)?;
        Some(self.layers.remove(index))
    }

    /// First layer named `name`.
    pub fn get(&self, name: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.name() == name)
    }

    /// Layers, lowest precedence first.
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Number of top-level layers.
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    /// `true` if the stack has no layers.
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    /// Every flat layer with composites expanded, lowest precedence first.
    pub fn property_layers(&self) -> Vec<&PropertyLayer> {
        let mut out = Vec::new();
        for layer in &self.layers {
            layer.collect_properties(&mut out);
        }
        out
    }

    /// Build a [`config::Config`] with every flat layer added in precedence order.
    ///
    /// # Errors
    ///
    /// Returns an error if the `config` crate rejects a layer.
    pub fn build_config(&self) -> Result<config::Config, ConfigError> {
        let mut builder = config::Config::builder();
        for layer in self.property_layers() {
            builder = builder.add_source(layer.clone());
        }
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::{File, FileFormat};

    #[test]
    fn insert_replaces_in_place() {
        let mut layer = PropertyLayer::new("app")
            .with("a", "1")
            .with("b", "2");
        layer.insert("a", "3");
        assert_eq!(
            layer.entries(),
            &[("a".to_owned(), "3".to_owned()), ("b".to_owned(), "2".to_owned())]
        );
        assert_eq!(layer.get("b"), Some("2"));
        assert_eq!(layer.get("c"), None);
    }

    #[test]
    fn flattens_nested_json() {
        let source = File::from_str(
            r#"{
                "db": {"user": "app", "port": 5432, "tls": true},
                "hosts": ["a", {"name": "b", "weight": 1.5}],
                "unset": null
            }"#,
            FileFormat::Json,
        );
        let layer = PropertyLayer::from_source("app.json", &source).unwrap();
        assert_eq!(layer.get("db.user"), Some("app"));
        assert_eq!(layer.get("db.port"), Some("5432"));
        assert_eq!(layer.get("db.tls"), Some("true"));
        assert_eq!(layer.get("hosts[0]"), Some("a"));
        assert_eq!(layer.get("hosts[1].name"), Some("b"));
        assert_eq!(layer.get("hosts[1].weight"), Some("1.5"));
        assert_eq!(layer.get("unset"), None);
    }

    #[test]
    fn stack_remove_and_get() {
        let mut stack = LayerStack::new();
        stack
            .push(PropertyLayer::new("low"))
            .push(CompositeLayer::new("group").with(PropertyLayer::new("nested")))
            .push(PropertyLayer::new("high"));
        assert_eq!(stack.len(), 3);
        assert!(stack.get("group").is_some());
        assert!(stack.remove("group").is_some());
        assert!(stack.remove("group").is_none());
        let names: Vec<_> = stack.layers().iter().map(Layer::name).collect();
        assert_eq!(names, vec!["low", "high"]);
    }

    #[test]
    fn property_layers_expand_composites_in_order() {
        let mut stack = LayerStack::new();
        stack
            .push(PropertyLayer::new("a"))
            .push(
                CompositeLayer::new("group")
                    .with(PropertyLayer::new("b"))
                    .with(CompositeLayer::new("inner").with(PropertyLayer::new("c"))),
            )
            .push(PropertyLayer::new("d"));
        let names: Vec<_> = stack.property_layers().iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn build_config_honours_precedence() {
        let mut stack = LayerStack::new();
        stack
            .push(
                PropertyLayer::new("defaults")
                    .with("db.user", "root")
                    .with("db.host", "localhost"),
            )
            .push(PropertyLayer::new("override").with("db.user", "app"));
        let cfg = stack.build_config().unwrap();
        assert_eq!(cfg.get_string("db.user").unwrap(), "app");
        assert_eq!(cfg.get_string("db.host").unwrap(), "localhost");
    }

    #[test]
    fn build_config_reassembles_arrays() {
        let mut stack = LayerStack::new();
        stack.push(
            PropertyLayer::new("list")
                .with("servers[0]", "a")
                .with("servers[1]", "b"),
        );
        let cfg = stack.build_config().unwrap();
        let servers: Vec<String> = cfg.get("servers").unwrap();
        assert_eq!(servers, vec!["a", "b"]);
    }

    #[test]
    fn debug_hides_values() {
        let layer = PropertyLayer::new("secrets").with("db.password", "hunter2");
        let rendered = format!("{layer:?}");
        assert!(rendered.contains("db.password"));
        assert!(!rendered.contains("hunter2"));
    }
}
