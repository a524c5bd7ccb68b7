//! Story descriptors kept in the synchronous key-value tier.

use std::cmp::Ordering;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use crate::error::{BookshelfError, Result};
use crate::traits::KeyValueStorage;
use crate::types::{SortOrder, StoryDescriptor, StoryId};

/// Key holding the JSON array of descriptors.
pub const STORIES_KEY: &str = "stories";

/// Descriptor list, loaded once and written back in full on every change.
pub struct MetadataStore {
    storage: Arc<dyn KeyValueStorage>,
    stories: RwLock<Vec<StoryDescriptor>>,
}

impl MetadataStore {
    /// Load the descriptor list, initialising the key when it is absent.
    pub fn load(storage: Arc<dyn KeyValueStorage>) -> Result<Self> {
        let stories = match storage.get_item(STORIES_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| BookshelfError::json("Failed to parse stored descriptors", e))?,
            None => {
                storage.set_item(STORIES_KEY, "[]")?;
                Vec::new()
            }
        };

        Ok(Self {
            storage,
            stories: RwLock::new(stories),
        })
    }

    fn poisoned() -> BookshelfError {
        BookshelfError::backend("Descriptor list lock poisoned")
    }

    fn persist(&self, stories: &[StoryDescriptor]) -> Result<()> {
        let raw = serde_json::to_string(stories)
            .map_err(|e| BookshelfError::json("Failed to serialize descriptors", e))?;
        self.storage.set_item(STORIES_KEY, &raw)
    }

    /// Apply `change` to a copy of the list and keep it only once persisted.
    fn modify<T>(&self, change: impl FnOnce(&mut Vec<StoryDescriptor>) -> T) -> Result<T> {
        let mut stories = self.stories.write().map_err(|_| Self::poisoned())?;
        let mut updated = stories.clone();
        let result = change(&mut updated);
        self.persist(&updated)?;
        *stories = updated;
        Ok(result)
    }

    pub fn list(&self) -> Result<Vec<StoryDescriptor>> {
        Ok(self.stories.read().map_err(|_| Self::poisoned())?.clone())
    }

    pub fn list_sorted(&self, order: SortOrder) -> Result<Vec<StoryDescriptor>> {
        let mut stories = self.list()?;
        sort_descriptors(&mut stories, order);
        Ok(stories)
    }

    pub fn get(&self, id: &StoryId) -> Result<Option<StoryDescriptor>> {
        let stories = self.stories.read().map_err(|_| Self::poisoned())?;
        Ok(stories.iter().find(|s| s.id == *id).cloned())
    }

    pub fn contains(&self, id: &StoryId) -> Result<bool> {
        Ok(self.get(id)?.is_some())
    }

    /// Replace the descriptor with the same id, or insert it at the front.
    pub fn upsert(&self, descriptor: StoryDescriptor) -> Result<()> {
        self.modify(|stories| {
            match stories.iter().position(|s| s.id == descriptor.id) {
                Some(index) => stories[index] = descriptor,
                None => stories.insert(0, descriptor),
            }
        })
    }

    /// Mark a story as read now.
    pub fn touch(&self, id: &StoryId) -> Result<Option<StoryDescriptor>> {
        self.modify(|stories| {
            stories.iter_mut().find(|s| s.id == *id).map(|story| {
                story.last_accessed = Utc::now();
                story.clone()
            })
        })
    }

    pub fn delete(&self, id: &StoryId) -> Result<bool> {
        if !self.contains(id)? {
            return Ok(false);
        }
        self.modify(|stories| {
            let before = stories.len();
            stories.retain(|s| s.id != *id);
            stories.len() != before
        })
    }
}

fn compare_text(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

/// Order descriptors for display.
pub fn sort_descriptors(stories: &mut [StoryDescriptor], order: SortOrder) {
    match order {
        SortOrder::Title => {
            stories.sort_by(|a, b| compare_text(a.display_title(), b.display_title()))
        }
        SortOrder::Author => stories.sort_by(|a, b| {
            compare_text(
                a.author.as_deref().unwrap_or(&a.filename),
                b.author.as_deref().unwrap_or(&b.filename),
            )
            .then_with(|| compare_text(a.display_title(), b.display_title()))
        }),
        SortOrder::DateAdded => stories.sort_by(|a, b| b.created.cmp(&a.created)),
        SortOrder::LastAccessed => stories.sort_by(|a, b| b.last_accessed.cmp(&a.last_accessed)),
    }
}
