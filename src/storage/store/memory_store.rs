//! An in-memory store.

use parking_lot::{Mutex, RwLock};

use crate::storage::{
    MaybeBytes, ReadableStorageTraits, StorageError, StoreKey, StoreKeys, WritableStorageTraits,
};

use std::{collections::BTreeMap, sync::Arc};

/// An in-memory store.
#[derive(Debug)]
pub struct MemoryStore {
    data_map: Mutex<BTreeMap<StoreKey, Arc<RwLock<Vec<u8>>>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            data_map: Mutex::default(),
        }
    }

    /// Return the keys of the store in sorted order.
    #[must_use]
    pub fn keys(&self) -> StoreKeys {
        self.data_map.lock().keys().cloned().collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadableStorageTraits for MemoryStore {
    fn get(&self, key: &StoreKey) -> Result<MaybeBytes, StorageError> {
        let data_map = self.data_map.lock();
        let data = data_map.get(key).cloned();
        drop(data_map);
        Ok(data.map(|data| data.read().clone()))
    }

    fn size_key(&self, key: &StoreKey) -> Result<Option<u64>, StorageError> {
        let data_map = self.data_map.lock();
        Ok(data_map.get(key).map(|entry| entry.read().len() as u64))
    }
}

impl WritableStorageTraits for MemoryStore {
    fn set(&self, key: &StoreKey, value: &[u8]) -> Result<(), StorageError> {
        let mut data_map = self.data_map.lock();
        let data = data_map
            .entry(key.clone())
            .or_insert_with(|| Arc::new(RwLock::default()))
            .clone();
        drop(data_map);
        *data.write() = value.to_vec();
        Ok(())
    }

    fn erase(&self, key: &StoreKey) -> Result<bool, StorageError> {
        let mut data_map = self.data_map.lock();
        Ok(data_map.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn memory_set_get_erase() -> Result<(), Box<dyn Error>> {
        let store = MemoryStore::new();
        let key = StoreKey::new("a/b")?;
        assert_eq!(store.get(&key)?, None);
        store.set(&key, &[0, 1, 2])?;
        assert_eq!(store.get(&key)?, Some(vec![0, 1, 2]));
        assert_eq!(store.size_key(&key)?, Some(3));
        store.set(&key, &[3])?;
        assert_eq!(store.get(&key)?, Some(vec![3]));
        assert_eq!(store.keys(), vec![key.clone()]);
        assert!(store.erase(&key)?);
        assert!(!store.erase(&key)?);
        assert_eq!(store.size_key(&key)?, None);
        Ok(())
    }
}
