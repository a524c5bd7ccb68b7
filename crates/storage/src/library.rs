//! The story library: importing, loading and removing stories across both
//! storage tiers.

use std::sync::Arc;

use bookshelf_types::Story;
use chrono::Utc;
use dashmap::DashMap;

use crate::bookmarks::BookmarkStore;
use crate::database::schema::CONTENT_HASH_INDEX;
use crate::database::{ContentDatabase, DatabaseSession};
use crate::error::{BookshelfError, Result};
use crate::images::ImageCache;
use crate::metadata::MetadataStore;
use crate::settings::SettingsStore;
use crate::traits::{ImageFetcher, KeyValueStorage};
use crate::types::{
    IdStrategy, ImportOutcome, StoryContentRecord, StoryDescriptor, StoryId, sha256_hex,
};

/// Import behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryOptions {
    pub id_strategy: IdStrategy,
    /// Cache every image of a structured story while importing it.
    pub warm_images: bool,
}

impl Default for LibraryOptions {
    fn default() -> Self {
        Self {
            id_strategy: IdStrategy::ContentDerived,
            warm_images: true,
        }
    }
}

/// Derive the identifier a story is stored under.
///
/// Content-derived ids hash the filename for raw text and the title and
/// author for structured stories, so re-importing the same story lands on
/// the same id.
pub fn derive_story_id(strategy: IdStrategy, filename: &str, story: &Story) -> StoryId {
    match strategy {
        IdStrategy::Random => StoryId::new(uuid::Uuid::new_v4().to_string()),
        IdStrategy::ContentDerived => match story {
            Story::RawText { .. } => StoryId::new(sha256_hex(filename.as_bytes())),
            Story::Structured { title, author, .. } => {
                StoryId::new(sha256_hex(format!("{}\0{}", title, author).as_bytes()))
            }
        },
    }
}

/// Descriptors, bookmarks and settings in the synchronous tier, story
/// content and images in the content database.
///
/// Without a database (metadata-only mode) descriptors still persist, story
/// content lives only for the lifetime of this value and images resolve to
/// their original URLs.
pub struct Library {
    metadata: MetadataStore,
    bookmarks: BookmarkStore,
    settings: SettingsStore,
    database: Option<Arc<ContentDatabase>>,
    images: ImageCache,
    session_content: DashMap<StoryId, StoryContentRecord>,
    options: LibraryOptions,
}

impl Library {
    pub async fn open(
        storage: Arc<dyn KeyValueStorage>,
        session: &DatabaseSession,
        fetcher: Arc<dyn ImageFetcher>,
        options: LibraryOptions,
    ) -> Result<Self> {
        let metadata = MetadataStore::load(storage.clone())?;
        let database = session.open().await?;
        if database.is_none() {
            tracing::warn!("Library opened without a content database");
        }

        Ok(Self {
            metadata,
            bookmarks: BookmarkStore::new(storage.clone()),
            settings: SettingsStore::new(storage),
            images: ImageCache::new(database.clone(), fetcher),
            database,
            session_content: DashMap::new(),
            options,
        })
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn bookmarks(&self) -> &BookmarkStore {
        &self.bookmarks
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn images(&self) -> &ImageCache {
        &self.images
    }

    pub fn is_metadata_only(&self) -> bool {
        self.database.is_none()
    }

    /// All descriptors in the order chosen in the settings.
    pub fn stories(&self) -> Result<Vec<StoryDescriptor>> {
        let order = self.settings.load()?.sort;
        self.metadata.list_sorted(order)
    }

    async fn get_content(&self, id: &StoryId) -> Result<Option<StoryContentRecord>> {
        match &self.database {
            Some(database) => database.get(id.as_str()).await,
            None => Ok(self.session_content.get(id).map(|r| r.value().clone())),
        }
    }

    async fn put_content(&self, record: &StoryContentRecord) -> Result<()> {
        match &self.database {
            Some(database) => database.put(record).await,
            None => {
                self.session_content.insert(record.id.clone(), record.clone());
                Ok(())
            }
        }
    }

    async fn add_content(&self, record: &StoryContentRecord) -> Result<()> {
        let Some(database) = &self.database else {
            return self.put_content(record).await;
        };

        match database.add(record).await {
            Err(e) if e.is_already_exists() => {
                tracing::warn!(id = %record.id, "Replacing content that had no descriptor");
                database.put(record).await
            }
            other => other,
        }
    }

    async fn delete_content(&self, id: &StoryId) -> Result<bool> {
        match &self.database {
            Some(database) => database.delete::<StoryContentRecord>(id.as_str()).await,
            None => Ok(self.session_content.remove(id).is_some()),
        }
    }

    /// A listed story whose stored content hashes to `content_hash`.
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<StoryId>> {
        let candidates: Vec<StoryId> = match &self.database {
            Some(database) => database
                .keys_for_index::<StoryContentRecord>(CONTENT_HASH_INDEX, content_hash)
                .await?
                .into_iter()
                .map(StoryId::new)
                .collect(),
            None => self
                .session_content
                .iter()
                .filter(|entry| entry.value().content_hash == content_hash)
                .map(|entry| entry.key().clone())
                .collect(),
        };

        for id in candidates {
            if self.metadata.contains(&id)? {
                return Ok(Some(id));
            }
        }
        Ok(None)
    }

    async fn warm_story_images(&self, story: &Story) {
        if !self.options.warm_images {
            return;
        }
        let urls = story.image_urls();
        if urls.is_empty() {
            return;
        }

        let total = urls.len();
        let cached = self.images.warm(urls).await;
        tracing::debug!(cached, total, "Warmed story images");
    }

    /// Add a parsed story to the library.
    ///
    /// Importing a story whose id is already listed is a no-op when the
    /// content hash matches, and replaces the stored content otherwise.
    pub async fn import(&self, filename: &str, story: &Story) -> Result<ImportOutcome> {
        let id = derive_story_id(self.options.id_strategy, filename, story);
        let record = StoryContentRecord::new(id.clone(), story.content())?;

        if self.options.id_strategy == IdStrategy::Random {
            if let Some(existing) = self.find_by_hash(&record.content_hash).await? {
                tracing::info!(id = %existing, filename, "Story already in library");
                return Ok(ImportOutcome {
                    id: existing,
                    already_existed: true,
                    content_written: false,
                });
            }
        }

        let now = Utc::now();

        if let Some(existing) = self.metadata.get(&id)? {
            let stored = self.get_content(&id).await?;
            if stored.is_some_and(|s| s.content_hash == record.content_hash) {
                tracing::info!(id = %id, filename, "Story already in library");
                return Ok(ImportOutcome {
                    id,
                    already_existed: true,
                    content_written: false,
                });
            }

            self.put_content(&record).await?;
            self.metadata.upsert(StoryDescriptor {
                id: id.clone(),
                filename: filename.to_string(),
                format: story.format(),
                created: existing.created,
                last_accessed: now,
                title: story.title().map(str::to_string),
                author: story.author().map(str::to_string),
            })?;
            self.warm_story_images(story).await;

            tracing::info!(id = %id, filename, "Updated story content");
            return Ok(ImportOutcome {
                id,
                already_existed: true,
                content_written: true,
            });
        }

        self.add_content(&record).await?;
        self.metadata.upsert(StoryDescriptor {
            id: id.clone(),
            filename: filename.to_string(),
            format: story.format(),
            created: now,
            last_accessed: now,
            title: story.title().map(str::to_string),
            author: story.author().map(str::to_string),
        })?;
        self.warm_story_images(story).await;

        tracing::info!(id = %id, filename, "Imported story");
        Ok(ImportOutcome {
            id,
            already_existed: false,
            content_written: true,
        })
    }

    /// Descriptor and full story for reading; marks the story as accessed.
    pub async fn load(&self, id: &StoryId) -> Result<(StoryDescriptor, Story)> {
        let (descriptor, story) = self.peek(id).await?;
        let descriptor = self.metadata.touch(id)?.unwrap_or(descriptor);
        Ok((descriptor, story))
    }

    /// Like [`Library::load`], without writing anything.
    pub async fn peek(&self, id: &StoryId) -> Result<(StoryDescriptor, Story)> {
        let descriptor = self
            .metadata
            .get(id)?
            .ok_or_else(|| BookshelfError::story_not_found(id.as_str()))?;

        let record = self
            .get_content(id)
            .await?
            .ok_or_else(|| BookshelfError::StoryNotFound {
                id: id.to_string(),
                source: Some(eyre::eyre!("Descriptor exists but content is missing")),
            })?;

        let story = Story::from_parts(
            record.content,
            descriptor.title.as_deref(),
            descriptor.author.as_deref(),
        );
        Ok((descriptor, story))
    }

    /// Delete a story's content, descriptor and bookmark.
    pub async fn remove(&self, id: &StoryId) -> Result<()> {
        if !self.metadata.contains(id)? {
            return Err(BookshelfError::story_not_found(id.as_str()));
        }

        if !self.delete_content(id).await? {
            tracing::warn!(id = %id, "Removed story had no stored content");
        }
        self.metadata.delete(id)?;
        self.bookmarks.delete(id)?;

        tracing::info!(id = %id, "Removed story");
        Ok(())
    }
}
