//! Bidirectional family registry.
//!
//! Tracks which cached keys belong to which families so an invalidation
//! can reach every affected entry without scanning the store.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use super::keys::{KeyFamily, QueryKey};
use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::registry";

pub struct KeyRegistry {
    family_to_keys: RwLock<HashMap<KeyFamily, HashSet<QueryKey>>>,
    key_to_families: RwLock<HashMap<QueryKey, Vec<KeyFamily>>>,
}

impl KeyRegistry {
    pub fn new() -> Self {
        Self {
            family_to_keys: RwLock::new(HashMap::new()),
            key_to_families: RwLock::new(HashMap::new()),
        }
    }

    /// Register a key under the families it derives from.
    pub fn register(&self, key: &QueryKey) {
        let families = key.families();
        let mut f2k = rw_write(&self.family_to_keys, SOURCE, "register.f2k");
        let mut k2f = rw_write(&self.key_to_families, SOURCE, "register.k2f");

        for family in &families {
            f2k.entry(family.clone()).or_default().insert(key.clone());
        }
        k2f.insert(key.clone(), families);
    }

    pub fn keys_for_family(&self, family: &KeyFamily) -> HashSet<QueryKey> {
        rw_read(&self.family_to_keys, SOURCE, "keys_for_family")
            .get(family)
            .cloned()
            .unwrap_or_default()
    }

    /// Forget a key, typically after LRU eviction.
    pub fn unregister(&self, key: &QueryKey) {
        let mut f2k = rw_write(&self.family_to_keys, SOURCE, "unregister.f2k");
        let mut k2f = rw_write(&self.key_to_families, SOURCE, "unregister.k2f");

        if let Some(families) = k2f.remove(key) {
            for family in families {
                if let Some(keys) = f2k.get_mut(&family) {
                    keys.remove(key);
                    if keys.is_empty() {
                        f2k.remove(&family);
                    }
                }
            }
        }
    }

    pub fn clear(&self) {
        rw_write(&self.family_to_keys, SOURCE, "clear.f2k").clear();
        rw_write(&self.key_to_families, SOURCE, "clear.k2f").clear();
    }

    pub fn family_count(&self) -> usize {
        rw_read(&self.family_to_keys, SOURCE, "family_count").len()
    }

    pub fn key_count(&self) -> usize {
        rw_read(&self.key_to_families, SOURCE, "key_count").len()
    }
}

impl Default for KeyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
