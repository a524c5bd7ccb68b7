//! Basic usage example for the storage crate.
//!
//! Imports a raw text story and a structured one into a library kept in a
//! temporary directory, then reads one back and removes the other.
//!
//! Run with: cargo run --example basic_usage

use std::sync::Arc;

use async_trait::async_trait;
use bookshelf_storage::{
    BookshelfError, ChapterNode, DatabaseConfig, DatabaseSession, FetchedImage,
    FileKeyValueStorage, ImageFetcher, Library, LibraryOptions, Result, SortOrder, Story,
};
use bookshelf_types::Chapter;
use tempfile::TempDir;

/// Serves a single placeholder image so the example stays offline.
struct PlaceholderFetcher;

#[async_trait]
impl ImageFetcher for PlaceholderFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        if url.ends_with(".png") {
            Ok(FetchedImage {
                content_type: Some("image/png".to_string()),
                bytes: vec![0x89, b'P', b'N', b'G'],
            })
        } else {
            Err(BookshelfError::FetchFailed {
                url: url.to_string(),
                source: None,
            })
        }
    }
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    println!("🚀 Storage Basic Usage Example");

    let temp_dir = TempDir::new()?;
    println!("📁 Using temporary storage at: {:?}", temp_dir.path());

    let storage = Arc::new(FileKeyValueStorage::new(temp_dir.path().join("local"))?);
    let session = DatabaseSession::new(DatabaseConfig::new(temp_dir.path().join("bookshelf")));
    let library = Library::open(
        storage,
        &session,
        Arc::new(PlaceholderFetcher),
        LibraryOptions::default(),
    )
    .await?;
    println!("✅ Library opened");

    let notes = Story::from_text("First line...\nSecond line");
    let outcome = library.import("notes.txt", &notes).await?;
    println!("💾 Imported notes.txt as {}", outcome.id);

    let tale = Story::Structured {
        title: "A Short Tale".to_string(),
        author: "Anonymous".to_string(),
        chapters: vec![Chapter {
            title: Some("Beginning".to_string()),
            contents: vec![
                ChapterNode::text("Once upon a time..."),
                ChapterNode::image("https://example.com/cover.png"),
            ],
        }],
    };
    let tale_id = library.import("tale.json", &tale).await?.id;
    println!("💾 Imported tale.json as {}", tale_id);

    // Importing the same content again leaves the library untouched
    let again = library.import("tale.json", &tale).await?;
    println!(
        "🔁 Re-import: already existed = {}, content written = {}",
        again.already_existed, again.content_written
    );

    let mut settings = library.settings().load()?;
    settings.sort = SortOrder::Title;
    library.settings().save(&settings)?;
    for story in library.stories()? {
        println!("📚 {} ({})", story.display_title(), story.format);
    }

    let (descriptor, story) = library.load(&tale_id).await?;
    println!(
        "📖 Loaded '{}' with {} image(s)",
        descriptor.display_title(),
        story.image_urls().len()
    );
    if let Some(cached) = library
        .images()
        .get_cached("https://example.com/cover.png")
        .await?
    {
        println!("🖼️  Cover cached as {} bytes of data URI", cached.len());
    }

    library.bookmarks().save(&tale_id, 0, 1)?;
    println!("🔖 Bookmark: {:?}", library.bookmarks().load(&tale_id)?);

    library.remove(&outcome.id).await?;
    println!("🗑️  Removed notes.txt; {} story left", library.stories()?.len());

    println!("🎉 Example completed successfully!");
    Ok(())
}
