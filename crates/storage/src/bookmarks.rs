//! Reading positions, stored alongside descriptors.

use std::sync::{Arc, OnceLock, RwLock};

use crate::error::{BookshelfError, Result};
use crate::traits::KeyValueStorage;
use crate::types::{Bookmark, StoryId};

/// Key holding the JSON array of bookmarks.
pub const BOOKMARK_KEY: &str = "bookmark";

/// Bookmarks for every story, read from storage on first use.
pub struct BookmarkStore {
    storage: Arc<dyn KeyValueStorage>,
    bookmarks: OnceLock<RwLock<Vec<Bookmark>>>,
}

impl BookmarkStore {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            storage,
            bookmarks: OnceLock::new(),
        }
    }

    fn bookmarks(&self) -> Result<&RwLock<Vec<Bookmark>>> {
        if let Some(bookmarks) = self.bookmarks.get() {
            return Ok(bookmarks);
        }

        let loaded = match self.storage.get_item(BOOKMARK_KEY)? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| BookshelfError::json("Failed to parse stored bookmarks", e))?,
            None => {
                self.storage.set_item(BOOKMARK_KEY, "[]")?;
                Vec::new()
            }
        };

        Ok(self.bookmarks.get_or_init(|| RwLock::new(loaded)))
    }

    fn poisoned() -> BookshelfError {
        BookshelfError::backend("Bookmark lock poisoned")
    }

    fn persist(&self, bookmarks: &[Bookmark]) -> Result<()> {
        let raw = serde_json::to_string(bookmarks)
            .map_err(|e| BookshelfError::json("Failed to serialize bookmarks", e))?;
        self.storage.set_item(BOOKMARK_KEY, &raw)
    }

    /// The saved position, or the start of the story when none was saved.
    pub fn load(&self, id: &StoryId) -> Result<Bookmark> {
        let bookmarks = self.bookmarks()?.read().map_err(|_| Self::poisoned())?;
        Ok(bookmarks
            .iter()
            .find(|b| b.id == *id)
            .cloned()
            .unwrap_or_else(|| Bookmark::new(id.clone())))
    }

    pub fn save(&self, id: &StoryId, chapter_index: usize, element_index: i64) -> Result<()> {
        let mut bookmarks = self.bookmarks()?.write().map_err(|_| Self::poisoned())?;
        let mut updated = bookmarks.clone();

        match updated.iter().position(|b| b.id == *id) {
            Some(index) => {
                updated[index].chapter_index = chapter_index;
                updated[index].element_index = element_index;
            }
            None => updated.push(Bookmark {
                id: id.clone(),
                chapter_index,
                element_index,
            }),
        }

        self.persist(&updated)?;
        *bookmarks = updated;
        Ok(())
    }

    pub fn delete(&self, id: &StoryId) -> Result<()> {
        let mut bookmarks = self.bookmarks()?.write().map_err(|_| Self::poisoned())?;
        let mut updated = bookmarks.clone();
        updated.retain(|b| b.id != *id);

        self.persist(&updated)?;
        *bookmarks = updated;
        Ok(())
    }
}
