//! Utility functions for CLI operations.

use bookshelf_storage::{StoryDescriptor, StoryId};
use eyre::Result;

/// Resolve user input to a story id: an exact id, a unique id prefix, or a
/// case-insensitive title match.
pub fn resolve_story_id(input: &str, stories: &[StoryDescriptor]) -> Result<StoryId> {
    if let Some(story) = stories.iter().find(|s| s.id.as_str() == input) {
        return Ok(story.id.clone());
    }

    let by_prefix: Vec<_> = stories
        .iter()
        .filter(|s| s.id.as_str().starts_with(input))
        .collect();
    if by_prefix.len() == 1 {
        return Ok(by_prefix[0].id.clone());
    }

    let input_lower = input.to_lowercase();
    let by_title: Vec<_> = stories
        .iter()
        .filter(|s| s.display_title().to_lowercase() == input_lower)
        .collect();
    if by_title.len() == 1 {
        return Ok(by_title[0].id.clone());
    }

    let candidates = if by_prefix.len() > 1 { by_prefix } else { by_title };
    if candidates.is_empty() {
        return Err(eyre::eyre!(
            "Story not found: '{}'. Use 'bookshelf list' to see all stories",
            input
        ));
    }

    let mut message = format!("Multiple stories match '{}':", input);
    for story in candidates.iter().take(10) {
        message.push_str(&format!("\n  {} - {}", story.id, story.display_title()));
    }
    Err(eyre::eyre!(message))
}

/// Short form of an id for listings.
pub fn short_id(id: &StoryId) -> &str {
    let s = id.as_str();
    s.get(..12).unwrap_or(s)
}
