//! In-process key-value storage.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{BookshelfError, Result};
use crate::traits::KeyValueStorage;

/// Keeps values in memory, optionally capped at a total byte quota.
#[derive(Debug, Default)]
pub struct MemoryKeyValueStorage {
    items: RwLock<HashMap<String, String>>,
    quota: Option<u64>,
}

impl MemoryKeyValueStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject writes once keys plus values would exceed `quota` bytes.
    pub fn with_quota(quota: u64) -> Self {
        Self {
            items: RwLock::default(),
            quota: Some(quota),
        }
    }

    fn poisoned() -> BookshelfError {
        BookshelfError::backend("Key-value storage lock poisoned")
    }
}

impl KeyValueStorage for MemoryKeyValueStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let items = self.items.read().map_err(|_| Self::poisoned())?;
        Ok(items.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.write().map_err(|_| Self::poisoned())?;

        if let Some(quota) = self.quota {
            let others: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let size = (others + key.len() + value.len()) as u64;
            if size > quota {
                return Err(BookshelfError::QuotaExceeded {
                    key: key.to_string(),
                    size,
                    quota,
                });
            }
        }

        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let mut items = self.items.write().map_err(|_| Self::poisoned())?;
        items.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quota_rejects_oversized_writes_and_keeps_old_value() {
        let storage = MemoryKeyValueStorage::with_quota(16);
        storage.set_item("key", "small").unwrap();

        let err = storage.set_item("key", "a much longer value").unwrap_err();
        assert!(matches!(err, BookshelfError::QuotaExceeded { quota: 16, .. }));
        assert_eq!(storage.get_item("key").unwrap().as_deref(), Some("small"));
    }

    #[test]
    fn replacing_a_value_does_not_count_it_twice() {
        let storage = MemoryKeyValueStorage::with_quota(10);
        storage.set_item("k", "123456789").unwrap();
        storage.set_item("k", "987654321").unwrap();
    }
}
