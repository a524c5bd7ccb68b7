//! Error types for the Bookshelf storage layer.

use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum BookshelfError {
    #[error("Story not found: {id}")]
    StoryNotFound {
        id: String,
        #[source]
        source: Option<eyre::Report>,
    },

    #[error("Image not found: {url}")]
    ImageNotFound {
        url: String,
        #[source]
        source: Option<eyre::Report>,
    },

    #[error("Content database is unavailable")]
    StorageUnavailable {
        #[source]
        source: Option<eyre::Report>,
    },

    #[error("Record already exists: collection={collection}, key={key}")]
    RecordAlreadyExists { collection: String, key: String },

    #[error("Unknown collection: {collection}")]
    UnknownCollection { collection: String },

    #[error("Unknown index '{index}' on collection '{collection}'")]
    UnknownIndex { collection: String, index: String },

    #[error("Requested schema version {requested} is older than stored version {stored}")]
    SchemaVersion { requested: u32, stored: u32 },

    #[error("Invalid schema version: {version}")]
    InvalidSchemaVersion { version: u32 },

    #[error("Storage quota exceeded writing '{key}': {size} bytes (quota: {quota} bytes)")]
    QuotaExceeded { key: String, size: u64, quota: u64 },

    #[error("Data conversion failed: {message}")]
    DataConversionError {
        message: String,
        #[source]
        source: Option<eyre::Report>,
    },

    #[error("Failed to fetch {url}")]
    FetchFailed {
        url: String,
        #[source]
        source: Option<eyre::Report>,
    },

    #[error("Storage backend error")]
    BackendError {
        #[source]
        source: Option<eyre::Report>,
    },
}

impl BookshelfError {
    pub(crate) fn backend(message: impl std::fmt::Display) -> Self {
        BookshelfError::BackendError {
            source: Some(eyre::eyre!("{}", message)),
        }
    }

    pub(crate) fn json(message: impl Into<String>, error: serde_json::Error) -> Self {
        BookshelfError::DataConversionError {
            message: message.into(),
            source: Some(eyre::eyre!("JSON error: {}", error)),
        }
    }

    pub(crate) fn story_not_found(id: impl Into<String>) -> Self {
        BookshelfError::StoryNotFound {
            id: id.into(),
            source: None,
        }
    }

    /// Whether this is a unique-key violation from an insert.
    pub fn is_already_exists(&self) -> bool {
        matches!(self, BookshelfError::RecordAlreadyExists { .. })
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            BookshelfError::StoryNotFound { .. } | BookshelfError::ImageNotFound { .. }
        )
    }
}

/// Result type alias for storage operations.
pub type Result<T> = std::result::Result<T, BookshelfError>;
