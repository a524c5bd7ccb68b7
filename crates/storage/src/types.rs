//! Supporting types for the storage layer.

use bookshelf_types::{StoryContent, StoryFormat};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{BookshelfError, Result};

/// Identifier of a story, shared by its descriptor and content record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoryId(pub String);

impl StoryId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for StoryId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for StoryId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Lightweight metadata kept in the synchronous tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryDescriptor {
    pub id: StoryId,
    pub filename: String,
    pub format: StoryFormat,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_accessed: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

impl StoryDescriptor {
    /// Title for display; raw-text stories fall back to their filename.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.filename)
    }
}

/// Full story body plus the hash used to detect unchanged re-imports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryContentRecord {
    pub id: StoryId,
    pub content: StoryContent,
    pub content_hash: String,
}

impl StoryContentRecord {
    pub fn new(id: StoryId, content: StoryContent) -> Result<Self> {
        let content_hash = content_hash(&content)?;
        Ok(Self {
            id,
            content,
            content_hash,
        })
    }
}

/// A cached image, stored as a base64 data URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRecord {
    pub url: String,
    pub data: String,
}

/// How new story identifiers are chosen on import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdStrategy {
    /// Hash of the filename (raw text) or of title and author (structured).
    #[default]
    ContentDerived,
    /// A fresh UUID on every import; disables deduplication.
    Random,
}

impl std::str::FromStr for IdStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "content" | "content_derived" => Ok(IdStrategy::ContentDerived),
            "random" => Ok(IdStrategy::Random),
            other => Err(format!("Unknown id strategy: {}", other)),
        }
    }
}

/// Result of importing a story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportOutcome {
    pub id: StoryId,
    /// A story with this id was already in the library.
    pub already_existed: bool,
    /// Whether the stored content was written by this import.
    pub content_written: bool,
}

/// A reading position inside a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub id: StoryId,
    pub chapter_index: usize,
    /// `-1` means the reader has not scrolled to any element yet.
    pub element_index: i64,
}

impl Bookmark {
    pub fn new(id: StoryId) -> Self {
        Self {
            id,
            chapter_index: 0,
            element_index: -1,
        }
    }
}

/// Library ordering shown in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    Title,
    Author,
    #[serde(rename = "Date Added")]
    DateAdded,
    #[serde(rename = "Last Accessed")]
    LastAccessed,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        SortOrder::Title,
        SortOrder::Author,
        SortOrder::DateAdded,
        SortOrder::LastAccessed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SortOrder::Title => "Title",
            SortOrder::Author => "Author",
            SortOrder::DateAdded => "Date Added",
            SortOrder::LastAccessed => "Last Accessed",
        }
    }
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let wanted = s.replace(['-', '_', ' '], "").to_lowercase();
        SortOrder::ALL
            .into_iter()
            .find(|order| order.name().replace(' ', "").to_lowercase() == wanted)
            .ok_or_else(|| format!("Unknown sort order: {}", s))
    }
}

/// Persisted user settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    #[serde(rename = "Sort", deserialize_with = "sort_or_default")]
    pub sort: SortOrder,
}

/// Unknown stored sort orders read back as the default.
fn sort_or_default<'de, D>(deserializer: D) -> std::result::Result<SortOrder, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(SortOrder::deserialize(&value).unwrap_or_else(|_| {
        tracing::warn!(stored = %value, "Unknown sort order in settings, using default");
        SortOrder::default()
    }))
}

pub(crate) fn sha256_hex(input: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input);
    format!("{:x}", hasher.finalize())
}

/// Digest of the serialized content.
pub fn content_hash(content: &StoryContent) -> Result<String> {
    let bytes = serde_json::to_vec(content)
        .map_err(|e| BookshelfError::json("Failed to serialize story content", e))?;
    Ok(sha256_hex(&bytes))
}
