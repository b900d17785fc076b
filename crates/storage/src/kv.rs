//! Key-value blob store interface.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;

use toc_common::TocResult;

/// Blob store with browser-storage semantics: string values under string keys.
pub trait KeyValueStore {
    /// Get a stored value, `None` when the key is absent.
    fn get(&self, key: &str) -> TocResult<Option<String>>;

    /// Store a value, replacing any previous one.
    fn set(&mut self, key: &str, value: String) -> TocResult<()>;

    /// Remove a key; removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> TocResult<()>;
}

/// JSON helpers on top of any [`KeyValueStore`].
pub trait KeyValueStoreExt: KeyValueStore {
    fn get_json<T: DeserializeOwned>(&self, key: &str) -> TocResult<Option<T>> {
        match self.get(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn set_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> TocResult<()> {
        let raw = serde_json::to_string(value)?;
        self.set(key, raw)
    }

    fn contains(&self, key: &str) -> TocResult<bool> {
        Ok(self.get(key)?.is_some())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStoreExt for S {}

/// Process-local store, used for session state and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> TocResult<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> TocResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> TocResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set_remove() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("Layers").unwrap(), None);

        store.set("Layers", "{}".to_string()).unwrap();
        assert_eq!(store.get("Layers").unwrap().as_deref(), Some("{}"));
        assert_eq!(store.len(), 1);

        store.remove("Layers").unwrap();
        store.remove("Layers").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_json_helpers() {
        let mut store = MemoryStore::new();
        store.set_json("Map Extent", &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let extent: Option<[f64; 4]> = store.get_json("Map Extent").unwrap();
        assert_eq!(extent, Some([1.0, 2.0, 3.0, 4.0]));
        assert!(store.contains("Map Extent").unwrap());
        assert!(!store.contains("Map Defaults").unwrap());
    }

    #[test]
    fn test_get_json_reports_bad_payload() {
        let mut store = MemoryStore::new();
        store.set("Layers", "not json".to_string()).unwrap();
        let result: TocResult<Option<Vec<String>>> = store.get_json("Layers");
        assert!(result.is_err());
    }
}
