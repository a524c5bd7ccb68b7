//! Shared story types for Bookshelf.
//!
//! These types describe an imported story and the chapter tree produced by the
//! story parser, in the typed form the rest of the workspace works with.

pub mod node;
pub mod parsed;
pub mod story;

pub use node::{ChapterNode, ElementNode, ImageNode};
pub use parsed::{ParsedTreeError, chapter_from_parsed, node_from_parsed, story_from_parsed};
pub use story::{Chapter, Story, StoryContent, StoryFormat};
