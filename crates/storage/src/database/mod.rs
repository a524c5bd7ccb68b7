//! Asynchronous, versioned content database.
//!
//! Records live in named collections and are addressed by a string key. Each
//! operation runs as a short transaction scoped to one collection: operations
//! on the same collection are serialized, different collections proceed
//! independently, and nothing spans collections.
//!
//! Directory structure:
//! ```text
//! database_root/
//! +-- schema.json
//! +-- stories/
//! |   +-- {sha256(key)}.json
//! +-- images/
//! |   +-- {sha256(key)}.json
//! +-- indexes/
//!     +-- stories.content_hash.json
//! ```

pub mod schema;
pub mod session;

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::fs;
use tokio::sync::Mutex;

use crate::error::{BookshelfError, Result};
use crate::types::{ImageRecord, StoryContentRecord, sha256_hex};

pub use schema::{DB_VERSION, SchemaChange, SchemaState, SchemaStep, bookshelf_schema};
pub use session::DatabaseSession;

/// A value that can be stored in a collection.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: &'static str;

    fn key(&self) -> &str;
}

impl Record for StoryContentRecord {
    const COLLECTION: &'static str = schema::STORIES;

    fn key(&self) -> &str {
        self.id.as_str()
    }
}

impl Record for ImageRecord {
    const COLLECTION: &'static str = schema::IMAGES;

    fn key(&self) -> &str {
        &self.url
    }
}

/// Where and at which schema version to open a database.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub root_path: PathBuf,
    pub version: u32,
    pub steps: Vec<SchemaStep>,
}

impl DatabaseConfig {
    /// The `bookshelf` database at the current schema version.
    pub fn new<P: AsRef<Path>>(root_path: P) -> Self {
        Self {
            root_path: root_path.as_ref().to_path_buf(),
            version: DB_VERSION,
            steps: bookshelf_schema(),
        }
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn with_steps(mut self, steps: Vec<SchemaStep>) -> Self {
        self.steps = steps;
        self
    }
}

type IndexMap = BTreeMap<String, BTreeSet<String>>;

/// Handle to an open content database.
#[derive(Debug)]
pub struct ContentDatabase {
    root_path: PathBuf,
    schema: SchemaState,
    locks: HashMap<String, Arc<Mutex<()>>>,
}

async fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents).await.map_err(|e| {
        BookshelfError::backend(format!("Failed to write {}: {}", tmp_path.display(), e))
    })?;
    fs::rename(&tmp_path, path).await.map_err(|e| {
        BookshelfError::backend(format!("Failed to replace {}: {}", path.display(), e))
    })
}

async fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path).await {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(BookshelfError::backend(format!(
            "Failed to read {}: {}",
            path.display(),
            e
        ))),
    }
}

/// Index value of a record, as stored in the index file.
fn index_value(record: &Value, key_path: &str) -> Option<String> {
    match record.get(key_path)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

impl ContentDatabase {
    /// Open the database, upgrading its schema when `config.version` is newer
    /// than what is on disk.
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        if config.version == 0 {
            return Err(BookshelfError::InvalidSchemaVersion {
                version: config.version,
            });
        }

        fs::create_dir_all(&config.root_path)
            .await
            .map_err(|e| BookshelfError::StorageUnavailable {
                source: Some(eyre::eyre!(
                    "Failed to create database directory {}: {}",
                    config.root_path.display(),
                    e
                )),
            })?;

        let mut database = Self {
            root_path: config.root_path.clone(),
            schema: SchemaState::default(),
            locks: HashMap::new(),
        };

        if let Some(raw) = read_optional(&database.schema_path()).await? {
            database.schema = serde_json::from_str(&raw)
                .map_err(|e| BookshelfError::json("Failed to parse database schema", e))?;
        }

        let stored = database.schema.version;
        if config.version < stored {
            return Err(BookshelfError::SchemaVersion {
                requested: config.version,
                stored,
            });
        }

        if config.version > stored {
            database.upgrade(&config.steps, config.version).await?;
        }

        database.locks = database
            .schema
            .collections
            .iter()
            .map(|name| (name.clone(), Arc::new(Mutex::new(()))))
            .collect();

        tracing::debug!(
            path = %database.root_path.display(),
            version = database.schema.version,
            "Opened content database"
        );
        Ok(database)
    }

    async fn upgrade(&mut self, steps: &[SchemaStep], version: u32) -> Result<()> {
        let from = self.schema.version;

        for step in schema::pending_steps(steps, from, version) {
            for change in &step.changes {
                self.apply_change(change).await?;
            }
            tracing::info!(version = step.version, "Applied database schema step");
        }

        self.schema.version = version;
        self.save_schema().await?;
        tracing::info!(from, to = version, "Upgraded content database");
        Ok(())
    }

    async fn apply_change(&mut self, change: &SchemaChange) -> Result<()> {
        match change {
            SchemaChange::CreateCollection(name) => {
                fs::create_dir_all(self.collection_dir(name))
                    .await
                    .map_err(|e| {
                        BookshelfError::backend(format!(
                            "Failed to create collection {}: {}",
                            name, e
                        ))
                    })?;
                self.schema.collections.insert(name.to_string());
            }
            SchemaChange::CreateIndex {
                collection,
                name,
                key_path,
            } => {
                if !self.schema.has_collection(collection) {
                    return Err(BookshelfError::UnknownCollection {
                        collection: collection.to_string(),
                    });
                }
                if self.schema.has_index(collection, name) {
                    return Ok(());
                }

                let mut index = IndexMap::new();
                for record in self.scan(collection).await? {
                    if let (Some(key), Some(value)) = (
                        record.get("__key").and_then(Value::as_str),
                        index_value(&record["record"], key_path),
                    ) {
                        index.entry(value).or_default().insert(key.to_string());
                    }
                }

                fs::create_dir_all(self.root_path.join("indexes"))
                    .await
                    .map_err(|e| {
                        BookshelfError::backend(format!("Failed to create index directory: {}", e))
                    })?;
                self.save_index(collection, name, &index).await?;

                self.schema
                    .indexes
                    .entry(collection.to_string())
                    .or_default()
                    .insert(name.to_string(), key_path.to_string());
            }
            SchemaChange::DeleteIndex { collection, name } => {
                if let Some(indexes) = self.schema.indexes.get_mut(*collection) {
                    indexes.remove(*name);
                }
                match fs::remove_file(self.index_path(collection, name)).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == ErrorKind::NotFound => {}
                    Err(e) => {
                        return Err(BookshelfError::backend(format!(
                            "Failed to delete index {}.{}: {}",
                            collection, name, e
                        )));
                    }
                }
            }
        }
        Ok(())
    }

    /// Every stored entry of a collection as `{__key, record}` values.
    async fn scan(&self, collection: &str) -> Result<Vec<Value>> {
        let dir = self.collection_dir(collection);
        let mut entries = fs::read_dir(&dir).await.map_err(|e| {
            BookshelfError::backend(format!("Failed to read collection {}: {}", collection, e))
        })?;

        let mut records = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            BookshelfError::backend(format!("Failed to read collection {}: {}", collection, e))
        })? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(raw) = read_optional(&path).await? {
                let stored: Value = serde_json::from_str(&raw)
                    .map_err(|e| BookshelfError::json("Failed to parse stored record", e))?;
                records.push(stored);
            }
        }
        Ok(records)
    }

    pub fn version(&self) -> u32 {
        self.schema.version
    }

    pub fn schema(&self) -> &SchemaState {
        &self.schema
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    fn schema_path(&self) -> PathBuf {
        self.root_path.join("schema.json")
    }

    fn collection_dir(&self, collection: &str) -> PathBuf {
        self.root_path.join(collection)
    }

    fn record_path(&self, collection: &str, key: &str) -> PathBuf {
        self.collection_dir(collection)
            .join(format!("{}.json", sha256_hex(key.as_bytes())))
    }

    fn index_path(&self, collection: &str, index: &str) -> PathBuf {
        self.root_path
            .join("indexes")
            .join(format!("{}.{}.json", collection, index))
    }

    async fn save_schema(&self) -> Result<()> {
        let raw = serde_json::to_vec_pretty(&self.schema)
            .map_err(|e| BookshelfError::json("Failed to serialize database schema", e))?;
        write_atomic(&self.schema_path(), &raw).await
    }

    async fn load_index(&self, collection: &str, index: &str) -> Result<IndexMap> {
        match read_optional(&self.index_path(collection, index)).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| BookshelfError::json("Failed to parse index", e)),
            None => Ok(IndexMap::new()),
        }
    }

    async fn save_index(&self, collection: &str, index: &str, map: &IndexMap) -> Result<()> {
        let raw = serde_json::to_vec(map)
            .map_err(|e| BookshelfError::json("Failed to serialize index", e))?;
        write_atomic(&self.index_path(collection, index), &raw).await
    }

    /// Begin a transaction on `collection`.
    async fn transaction(&self, collection: &str) -> Result<tokio::sync::OwnedMutexGuard<()>> {
        let lock = self
            .locks
            .get(collection)
            .ok_or_else(|| BookshelfError::UnknownCollection {
                collection: collection.to_string(),
            })?;
        Ok(lock.clone().lock_owned().await)
    }

    async fn read_entry(&self, collection: &str, key: &str) -> Result<Option<Value>> {
        match read_optional(&self.record_path(collection, key)).await? {
            Some(raw) => {
                let mut stored: Value = serde_json::from_str(&raw)
                    .map_err(|e| BookshelfError::json("Failed to parse stored record", e))?;
                Ok(Some(stored["record"].take()))
            }
            None => Ok(None),
        }
    }

    /// Move `key` between index buckets after its record changed.
    async fn update_indexes(
        &self,
        collection: &str,
        key: &str,
        old: Option<&Value>,
        new: Option<&Value>,
    ) -> Result<()> {
        for (index, key_path) in self.schema.indexes_of(collection) {
            let old_value = old.and_then(|record| index_value(record, &key_path));
            let new_value = new.and_then(|record| index_value(record, &key_path));
            if old_value == new_value {
                continue;
            }

            let mut map = self.load_index(collection, &index).await?;
            if let Some(value) = old_value {
                if let Some(keys) = map.get_mut(&value) {
                    keys.remove(key);
                    if keys.is_empty() {
                        map.remove(&value);
                    }
                }
            }
            if let Some(value) = new_value {
                map.entry(value).or_default().insert(key.to_string());
            }
            self.save_index(collection, &index, &map).await?;
        }
        Ok(())
    }

    async fn write_entry<R: Record>(&self, record: &R, overwrite: bool) -> Result<()> {
        let key = record.key();
        let old = self.read_entry(R::COLLECTION, key).await?;
        if old.is_some() && !overwrite {
            return Err(BookshelfError::RecordAlreadyExists {
                collection: R::COLLECTION.to_string(),
                key: key.to_string(),
            });
        }

        let value = serde_json::to_value(record)
            .map_err(|e| BookshelfError::json("Failed to serialize record", e))?;
        let stored = serde_json::json!({ "__key": key, "record": value });
        let raw = serde_json::to_vec(&stored)
            .map_err(|e| BookshelfError::json("Failed to serialize record", e))?;

        write_atomic(&self.record_path(R::COLLECTION, key), &raw).await?;
        self.update_indexes(R::COLLECTION, key, old.as_ref(), Some(&stored["record"]))
            .await
    }

    /// Fetch the record stored under `key`.
    pub async fn get<R: Record>(&self, key: &str) -> Result<Option<R>> {
        let _tx = self.transaction(R::COLLECTION).await?;
        match self.read_entry(R::COLLECTION, key).await? {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| BookshelfError::json("Failed to decode stored record", e)),
            None => Ok(None),
        }
    }

    /// Insert or replace a record.
    pub async fn put<R: Record>(&self, record: &R) -> Result<()> {
        let _tx = self.transaction(R::COLLECTION).await?;
        self.write_entry(record, true).await?;
        tracing::debug!(collection = R::COLLECTION, key = record.key(), "Put record");
        Ok(())
    }

    /// Insert a record, failing with `RecordAlreadyExists` if the key is taken.
    pub async fn add<R: Record>(&self, record: &R) -> Result<()> {
        let _tx = self.transaction(R::COLLECTION).await?;
        self.write_entry(record, false).await?;
        tracing::debug!(collection = R::COLLECTION, key = record.key(), "Added record");
        Ok(())
    }

    /// Delete the record under `key`, returning whether it existed.
    pub async fn delete<R: Record>(&self, key: &str) -> Result<bool> {
        let _tx = self.transaction(R::COLLECTION).await?;
        let Some(old) = self.read_entry(R::COLLECTION, key).await? else {
            return Ok(false);
        };

        fs::remove_file(self.record_path(R::COLLECTION, key))
            .await
            .map_err(|e| BookshelfError::backend(format!("Failed to delete record: {}", e)))?;
        self.update_indexes(R::COLLECTION, key, Some(&old), None)
            .await?;

        tracing::debug!(collection = R::COLLECTION, key, "Deleted record");
        Ok(true)
    }

    /// Number of records under `key`: 0 or 1.
    pub async fn count<R: Record>(&self, key: &str) -> Result<u64> {
        let _tx = self.transaction(R::COLLECTION).await?;
        let exists = fs::try_exists(self.record_path(R::COLLECTION, key))
            .await
            .map_err(|e| BookshelfError::backend(format!("Failed to check record: {}", e)))?;
        Ok(u64::from(exists))
    }

    /// Keys of the records whose indexed field equals `value`.
    pub async fn keys_for_index<R: Record>(&self, index: &str, value: &str) -> Result<Vec<String>> {
        if !self.schema.has_index(R::COLLECTION, index) {
            return Err(BookshelfError::UnknownIndex {
                collection: R::COLLECTION.to_string(),
                index: index.to_string(),
            });
        }

        let _tx = self.transaction(R::COLLECTION).await?;
        let map = self.load_index(R::COLLECTION, index).await?;
        Ok(map
            .get(value)
            .map(|keys| keys.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Number of records in the collection.
    pub async fn len<R: Record>(&self) -> Result<usize> {
        let _tx = self.transaction(R::COLLECTION).await?;
        Ok(self.scan(R::COLLECTION).await?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshelf_types::StoryContent;
    use tempfile::TempDir;

    fn story(id: &str, lines: &[&str]) -> StoryContentRecord {
        StoryContentRecord::new(
            id.into(),
            StoryContent::Lines(lines.iter().map(|s| s.to_string()).collect()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn put_get_delete_cycle() {
        let temp_dir = TempDir::new().unwrap();
        let db = ContentDatabase::open(&DatabaseConfig::new(temp_dir.path()))
            .await
            .unwrap();

        let record = story("a", &["line"]);
        db.put(&record).await.unwrap();

        assert_eq!(db.get::<StoryContentRecord>("a").await.unwrap(), Some(record));
        assert_eq!(db.count::<StoryContentRecord>("a").await.unwrap(), 1);
        assert_eq!(db.len::<StoryContentRecord>().await.unwrap(), 1);

        assert!(db.delete::<StoryContentRecord>("a").await.unwrap());
        assert!(!db.delete::<StoryContentRecord>("a").await.unwrap());
        assert_eq!(db.count::<StoryContentRecord>("a").await.unwrap(), 0);
        assert_eq!(db.get::<StoryContentRecord>("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn add_enforces_unique_keys() {
        let temp_dir = TempDir::new().unwrap();
        let db = ContentDatabase::open(&DatabaseConfig::new(temp_dir.path()))
            .await
            .unwrap();

        let image = ImageRecord {
            url: "https://example.com/a.png".into(),
            data: "data:image/png;charset=utf-8;base64,AA==".into(),
        };
        db.add(&image).await.unwrap();

        let err = db.add(&image).await.unwrap_err();
        assert!(err.is_already_exists());
    }

    #[tokio::test]
    async fn content_hash_index_tracks_puts_and_deletes() {
        let temp_dir = TempDir::new().unwrap();
        let db = ContentDatabase::open(&DatabaseConfig::new(temp_dir.path()))
            .await
            .unwrap();

        let first = story("a", &["same"]);
        let hash = first.content_hash.clone();
        db.put(&first).await.unwrap();
        db.put(&story("b", &["same"])).await.unwrap();

        let keys = db
            .keys_for_index::<StoryContentRecord>(schema::CONTENT_HASH_INDEX, &hash)
            .await
            .unwrap();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        db.put(&story("a", &["changed"])).await.unwrap();
        db.delete::<StoryContentRecord>("b").await.unwrap();

        let keys = db
            .keys_for_index::<StoryContentRecord>(schema::CONTENT_HASH_INDEX, &hash)
            .await
            .unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn unknown_index_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let db = ContentDatabase::open(&DatabaseConfig::new(temp_dir.path()))
            .await
            .unwrap();

        let err = db
            .keys_for_index::<ImageRecord>("data", "x")
            .await
            .unwrap_err();
        assert!(matches!(err, BookshelfError::UnknownIndex { .. }));
    }

    #[tokio::test]
    async fn version_zero_is_invalid() {
        let temp_dir = TempDir::new().unwrap();
        let err = ContentDatabase::open(&DatabaseConfig::new(temp_dir.path()).with_version(0))
            .await
            .unwrap_err();
        assert!(matches!(err, BookshelfError::InvalidSchemaVersion { version: 0 }));
    }
}
