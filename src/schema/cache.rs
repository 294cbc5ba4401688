//! Memoized Class lookups.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::types::NodeId;

use super::{ClassAttributes, ClassLink, PropertyInfo};

/// Lazily filled facts about one Class. A `None` field has not been loaded
/// yet; an empty `Vec` has been loaded and is empty.
#[derive(Clone, Debug, Default)]
struct CacheEntry {
    attributes: Option<ClassAttributes>,
    properties: Option<Vec<PropertyInfo>>,
    links: Option<Vec<ClassLink>>,
}

/// Hit and miss counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Classes with at least one populated field.
    pub entries: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that had to go to the store.
    pub misses: u64,
}

/// Per-engine memo keyed by Class identity, with a name index.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: FxHashMap<NodeId, CacheEntry>,
    by_name: FxHashMap<String, NodeId>,
    hits: u64,
    misses: u64,
}

impl SchemaCache {
    fn record<T>(&mut self, found: Option<T>) -> Option<T> {
        if found.is_some() {
            self.hits += 1;
        } else {
            self.misses += 1;
        }
        found
    }

    /// Identity of the Class called `name`, if its attributes are cached.
    pub fn id_for_name(&mut self, name: &str) -> Option<NodeId> {
        let found = self.by_name.get(name).copied();
        self.record(found)
    }

    /// Cached attributes.
    pub fn attributes(&mut self, id: NodeId) -> Option<ClassAttributes> {
        let found = self.entries.get(&id).and_then(|e| e.attributes.clone());
        self.record(found)
    }

    /// Caches attributes and indexes the name.
    pub fn store_attributes(&mut self, attributes: ClassAttributes) {
        let id = attributes.id;
        self.by_name.insert(attributes.name.clone(), id);
        self.entries.entry(id).or_default().attributes = Some(attributes);
    }

    /// Cached direct properties.
    pub fn properties(&mut self, id: NodeId) -> Option<Vec<PropertyInfo>> {
        let found = self.entries.get(&id).and_then(|e| e.properties.clone());
        self.record(found)
    }

    /// Caches direct properties.
    pub fn store_properties(&mut self, id: NodeId, properties: Vec<PropertyInfo>) {
        self.entries.entry(id).or_default().properties = Some(properties);
    }

    /// Cached outbound relationships.
    pub fn links(&mut self, id: NodeId) -> Option<Vec<ClassLink>> {
        let found = self.entries.get(&id).and_then(|e| e.links.clone());
        self.record(found)
    }

    /// Caches outbound relationships.
    pub fn store_links(&mut self, id: NodeId, links: Vec<ClassLink>) {
        self.entries.entry(id).or_default().links = Some(links);
    }

    /// Forgets everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.by_name.clear();
    }

    /// Current counters.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits,
            misses: self.misses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(id: u64, name: &str) -> ClassAttributes {
        ClassAttributes {
            id: NodeId(id),
            name: name.into(),
            uri: None,
            strict: Some(true),
            code: None,
            no_datanodes: false,
        }
    }

    #[test]
    fn fields_fill_independently() {
        let mut cache = SchemaCache::default();
        assert!(cache.attributes(NodeId(1)).is_none());
        cache.store_properties(NodeId(1), Vec::new());
        assert!(cache.attributes(NodeId(1)).is_none());
        assert_eq!(cache.properties(NodeId(1)), Some(Vec::new()));
        assert!(cache.links(NodeId(1)).is_none());

        cache.store_attributes(attrs(1, "City"));
        assert_eq!(cache.id_for_name("City"), Some(NodeId(1)));
        let stats = cache.stats();
        assert_eq!(stats.entries, 1);
        assert_eq!(stats.hits, 2);
        assert_eq!(stats.misses, 3);
    }

    #[test]
    fn clear_forgets_names() {
        let mut cache = SchemaCache::default();
        cache.store_attributes(attrs(3, "State"));
        cache.clear();
        assert!(cache.id_for_name("State").is_none());
        assert_eq!(cache.stats().entries, 0);
    }
}
