//! Trait definitions for the storage tiers and their collaborators.

use async_trait::async_trait;

use crate::error::Result;

/// Synchronous string key-value storage.
///
/// This is the lightweight tier: it holds story descriptors, bookmarks and
/// settings, each serialized as a single JSON value under a fixed key.
pub trait KeyValueStorage: Send + Sync {
    /// Read the value stored under `key`.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// Fails with `QuotaExceeded` when the backend cannot hold the value.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// Raw bytes and declared type of a fetched image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedImage {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Network access used by the image cache.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage>;
}
