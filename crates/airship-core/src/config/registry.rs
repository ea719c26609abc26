//! Named transformers available to manifests

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::transform::{IdentityTransformer, Transformer};

/// Name of the transformer used when an item names none.
pub const IDENTITY: &str = "identity";

/// Maps transformer names used in manifests to implementations.
///
/// Transformers are shared: every item naming the same transformer gets the
/// same instance.
#[derive(Clone)]
pub struct TransformerRegistry {
    transformers: BTreeMap<String, Arc<dyn Transformer>>,
}

impl TransformerRegistry {
    /// Registry holding only the builtin `identity` transformer.
    pub fn new() -> Self {
        let mut registry = Self {
            transformers: BTreeMap::new(),
        };
        registry.register(IDENTITY, IdentityTransformer);
        registry
    }

    /// Register `transformer` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, transformer: impl Transformer + 'static) {
        self.transformers.insert(name.into(), Arc::new(transformer));
    }

    pub fn register_shared(&mut self, name: impl Into<String>, transformer: Arc<dyn Transformer>) {
        self.transformers.insert(name.into(), transformer);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Transformer>> {
        self.transformers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.transformers.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.transformers.keys().map(String::as_str)
    }
}

impl Default for TransformerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::FnTransformer;

    #[test]
    fn identity_is_builtin() {
        let registry = TransformerRegistry::new();
        assert!(registry.contains("identity"));
        assert_eq!(registry.names().collect::<Vec<_>>(), vec!["identity"]);
    }

    #[test]
    fn register_replaces_and_shares() {
        let mut registry = TransformerRegistry::new();
        registry.register("upper", FnTransformer::builder().build());

        let first = registry.get("upper").unwrap();
        let second = registry.get("upper").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(registry.get("missing").is_none());
    }
}
