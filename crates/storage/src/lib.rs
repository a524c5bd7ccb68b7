//! Local persistence for the Bookshelf reader.
//!
//! Two tiers: a synchronous key-value store for story descriptors, bookmarks
//! and settings, and an asynchronous versioned content database for chapter
//! content and cached images. [`Library`] ties them together.

pub mod backends;
pub mod bookmarks;
pub mod database;
pub mod error;
pub mod images;
pub mod library;
pub mod metadata;
pub mod settings;
pub mod traits;
pub mod types;

// Re-export the main interface and types for easy access
pub use backends::{FileKeyValueStorage, MemoryKeyValueStorage};
pub use bookmarks::BookmarkStore;
pub use database::{ContentDatabase, DatabaseConfig, DatabaseSession, Record};
pub use error::{BookshelfError, Result};
pub use images::{ImageCache, ReqwestFetcher, resolve_proxy_url};
pub use library::{Library, LibraryOptions, derive_story_id};
pub use metadata::MetadataStore;
pub use settings::SettingsStore;
pub use traits::{FetchedImage, ImageFetcher, KeyValueStorage};
pub use types::{
    Bookmark, IdStrategy, ImageRecord, ImportOutcome, Settings, SortOrder, StoryContentRecord,
    StoryDescriptor, StoryId,
};

pub use bookshelf_types::{Chapter, ChapterNode, Story, StoryContent, StoryFormat};
