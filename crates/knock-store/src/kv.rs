use std::collections::HashMap;

use crate::error::Result;
use crate::store::Store;

/// String-keyed get/set/remove. The pattern store only needs this much of
/// whatever persistence sits underneath it.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

impl KeyValueStore for Store {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Store::get(self, key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        Store::set(self, key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        Store::remove(self, key)
    }
}

/// Volatile store for tests and ephemeral locks.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(kv: &mut impl KeyValueStore) {
        assert!(kv.get("k").unwrap().is_none());
        kv.set("k", "a").unwrap();
        kv.set("k", "b").unwrap();
        assert_eq!(kv.get("k").unwrap(), Some("b".to_string()));
        kv.remove("k").unwrap();
        kv.remove("k").unwrap();
        assert!(kv.get("k").unwrap().is_none());
    }

    #[test]
    fn test_memory_store_contract() {
        let mut kv = MemoryStore::new();
        exercise(&mut kv);
        assert!(kv.is_empty());
    }

    #[test]
    fn test_sqlite_store_contract() {
        let mut kv = Store::open_in_memory().unwrap();
        exercise(&mut kv);
    }
}
