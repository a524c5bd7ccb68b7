use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::node::ChapterNode;

/// How a story file was laid out when it was imported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryFormat {
    /// Unformatted text, one entry per line.
    RawText,
    /// Chapters with a title and author.
    Structured,
}

impl std::fmt::Display for StoryFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoryFormat::RawText => write!(f, "raw-text"),
            StoryFormat::Structured => write!(f, "structured"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub contents: Vec<ChapterNode>,
}

impl Chapter {
    /// Every image URL in the chapter, breadth first.
    pub fn image_urls(&self) -> Vec<String> {
        let mut queue: VecDeque<&ChapterNode> = self.contents.iter().collect();
        let mut urls = Vec::new();

        while let Some(node) = queue.pop_front() {
            match node {
                ChapterNode::Image(image) if !image.src.is_empty() => urls.push(image.src.clone()),
                ChapterNode::Element(element) => queue.extend(element.children.iter()),
                _ => {}
            }
        }

        urls
    }
}

/// The persisted body of a story.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryContent {
    Lines(Vec<String>),
    Chapters(Vec<Chapter>),
}

impl StoryContent {
    pub fn format(&self) -> StoryFormat {
        match self {
            StoryContent::Lines(_) => StoryFormat::RawText,
            StoryContent::Chapters(_) => StoryFormat::Structured,
        }
    }
}

/// A parsed story as handed over by the story parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Story {
    RawText {
        lines: Vec<String>,
    },
    Structured {
        title: String,
        author: String,
        chapters: Vec<Chapter>,
    },
}

impl Story {
    /// Split plain text into a raw-text story.
    pub fn from_text(text: &str) -> Self {
        Story::RawText {
            lines: text.lines().map(str::to_string).collect(),
        }
    }

    pub fn format(&self) -> StoryFormat {
        match self {
            Story::RawText { .. } => StoryFormat::RawText,
            Story::Structured { .. } => StoryFormat::Structured,
        }
    }

    pub fn title(&self) -> Option<&str> {
        match self {
            Story::RawText { .. } => None,
            Story::Structured { title, .. } => Some(title),
        }
    }

    pub fn author(&self) -> Option<&str> {
        match self {
            Story::RawText { .. } => None,
            Story::Structured { author, .. } => Some(author),
        }
    }

    pub fn content(&self) -> StoryContent {
        match self {
            Story::RawText { lines } => StoryContent::Lines(lines.clone()),
            Story::Structured { chapters, .. } => StoryContent::Chapters(chapters.clone()),
        }
    }

    /// Image URLs across all chapters, chapter by chapter.
    pub fn image_urls(&self) -> Vec<String> {
        match self {
            Story::RawText { .. } => Vec::new(),
            Story::Structured { chapters, .. } => {
                chapters.iter().flat_map(Chapter::image_urls).collect()
            }
        }
    }

    /// Rebuild a story from its persisted content and descriptor fields.
    ///
    /// Title and author are ignored for raw-text content.
    pub fn from_parts(content: StoryContent, title: Option<&str>, author: Option<&str>) -> Self {
        match content {
            StoryContent::Lines(lines) => Story::RawText { lines },
            StoryContent::Chapters(chapters) => Story::Structured {
                title: title.unwrap_or_default().to_string(),
                author: author.unwrap_or_default().to_string(),
                chapters,
            },
        }
    }
}
