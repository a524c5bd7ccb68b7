//! Library command handlers for importing, browsing and reading stories.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use bookshelf_render::{Display, ImageSignal, RenderedChapter, Renderer, to_html};
use bookshelf_storage::{Library, Story, StoryDescriptor, StoryFormat};
use bookshelf_types::story_from_parsed;
use eyre::{Result, WrapErr};
use tokio::fs;
use tracing::{info, warn};

use crate::utils::{resolve_story_id, short_id};

/// Parse a story file: `.json` files hold a parsed chapter tree, anything
/// else is raw text.
pub async fn read_story_file(path: &Path) -> Result<(String, Story)> {
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .ok_or_else(|| eyre::eyre!("Not a file: {}", path.display()))?;

    let text = fs::read_to_string(path)
        .await
        .wrap_err_with(|| format!("Failed to read {}", path.display()))?;

    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let story = if is_json {
        let value: serde_json::Value = serde_json::from_str(&text)
            .wrap_err_with(|| format!("Invalid JSON in {}", path.display()))?;
        story_from_parsed(&value).wrap_err_with(|| format!("Invalid story in {}", path.display()))?
    } else {
        Story::from_text(&text)
    };

    Ok((filename, story))
}

pub async fn handle_import(library: &Library, files: Vec<PathBuf>, dry_run: bool) -> Result<()> {
    let mut failed = 0;
    for path in files {
        let (filename, story) = match read_story_file(&path).await {
            Ok(parsed) => parsed,
            Err(e) => {
                println!("❌ {}: {:#}", path.display(), e);
                failed += 1;
                continue;
            }
        };

        if dry_run {
            println!(
                "Would import {} ({}, {} images)",
                filename,
                format_label(story.format()),
                story.image_urls().len()
            );
            continue;
        }

        match library.import(&filename, &story).await {
            Ok(outcome) if outcome.already_existed && !outcome.content_written => {
                println!("📚 {} is already in the library ({})", filename, outcome.id);
            }
            Ok(outcome) if outcome.already_existed => {
                println!("🔄 Updated {} ({})", filename, outcome.id);
            }
            Ok(outcome) => {
                println!("✅ Imported {} ({})", filename, outcome.id);
            }
            Err(e) => {
                println!("❌ Failed to import {}: {}", filename, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(eyre::eyre!("{} file(s) failed to import", failed));
    }
    Ok(())
}

fn format_descriptor_line(story: &StoryDescriptor) -> String {
    match &story.author {
        Some(author) => format!(
            "{}  {} by {}",
            short_id(&story.id),
            story.display_title(),
            author
        ),
        None => format!("{}  {}", short_id(&story.id), story.display_title()),
    }
}

pub async fn handle_list(library: &Library) -> Result<()> {
    let stories = library.stories()?;
    if stories.is_empty() {
        println!("No stories in library. Use 'bookshelf import <file>' to add some!");
        return Ok(());
    }

    let order = library.settings().load()?.sort;
    println!("Library ({} stories, by {}):", stories.len(), order.name());
    for story in &stories {
        println!("  {}", format_descriptor_line(story));
    }
    if library.is_metadata_only() {
        println!("⚠️  Content database unavailable; only titles are stored");
    }
    Ok(())
}

pub async fn handle_show(library: &Library, input: String) -> Result<()> {
    let id = resolve_story_id(&input, &library.metadata().list()?)?;
    let Some(story) = library.metadata().get(&id)? else {
        return Err(eyre::eyre!("Story not found: {}", id));
    };
    let bookmark = library.bookmarks().load(&id)?;

    println!("{}", story.display_title());
    if let Some(author) = &story.author {
        println!("Author: {}", author);
    }
    println!("Id: {}", story.id);
    println!("File: {}", story.filename);
    println!("Format: {}", story.format);
    println!("Added: {}", story.created.format("%Y-%m-%d %H:%M"));
    println!("Last read: {}", story.last_accessed.format("%Y-%m-%d %H:%M"));
    if bookmark.element_index >= 0 {
        println!(
            "Bookmark: chapter {}, element {}",
            bookmark.chapter_index + 1,
            bookmark.element_index
        );
    } else {
        println!("Bookmark: chapter {}", bookmark.chapter_index + 1);
    }
    Ok(())
}

fn chapter_html(chapter: &RenderedChapter) -> String {
    let body = to_html(&chapter.body);
    match &chapter.title {
        Some(title) => {
            let heading = Display::Element {
                tag: "h2".to_string(),
                attributes: BTreeMap::new(),
                children: vec![Display::Text(title.clone())],
            };
            format!("{}\n{}", heading.to_html(), body)
        }
        None => body,
    }
}

pub async fn handle_read(
    library: &Library,
    input: String,
    chapter: Option<usize>,
    output: Option<PathBuf>,
    dry_run: bool,
) -> Result<()> {
    let id = resolve_story_id(&input, &library.metadata().list()?)?;
    let (descriptor, story) = if dry_run {
        library.peek(&id).await?
    } else {
        library.load(&id).await?
    };
    let bookmark = library.bookmarks().load(&id)?;

    let rendered = match &story {
        Story::RawText { .. } => Renderer::new(library.images()).render_story(&story).await,
        Story::Structured { chapters, .. } => {
            if chapters.is_empty() {
                return Err(eyre::eyre!("{} has no chapters", descriptor.display_title()));
            }
            let index = chapter
                .map(|c| c.saturating_sub(1))
                .unwrap_or(bookmark.chapter_index)
                .min(chapters.len() - 1);

            let failed = AtomicUsize::new(0);
            let on_image = |signal: ImageSignal| {
                if !signal.loaded {
                    failed.fetch_add(1, Ordering::Relaxed);
                }
            };
            let rendered = Renderer::new(library.images())
                .on_image(&on_image)
                .render_chapter(&chapters[index])
                .await;

            let failed = failed.into_inner();
            if failed > 0 {
                warn!(failed, "Some images could not be cached and link to the web");
            }

            if !dry_run && index != bookmark.chapter_index {
                library.bookmarks().save(&id, index, -1)?;
            }
            vec![rendered]
        }
    };

    let html = format!(
        "<article data-story=\"{}\" data-format=\"{}\">\n{}\n</article>\n",
        id,
        descriptor.format,
        rendered
            .iter()
            .map(chapter_html)
            .collect::<Vec<_>>()
            .join("\n")
    );

    match output {
        Some(path) if dry_run => println!("Would write {} bytes to {}", html.len(), path.display()),
        Some(path) => {
            fs::write(&path, html).await?;
            info!(path = %path.display(), "Wrote rendered story");
            println!("✅ Wrote {} to {}", descriptor.display_title(), path.display());
        }
        None => print!("{}", html),
    }
    Ok(())
}

pub async fn handle_remove(library: &Library, input: String, force: bool, dry_run: bool) -> Result<()> {
    let id = resolve_story_id(&input, &library.metadata().list()?)?;
    let Some(story) = library.metadata().get(&id)? else {
        return Err(eyre::eyre!("Story not found: {}", id));
    };

    if dry_run {
        println!("Would remove: {} ({})", story.display_title(), id);
        return Ok(());
    }

    if !force {
        print!(
            "Are you sure you want to remove '{}'? (y/N): ",
            story.display_title()
        );
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().to_lowercase().starts_with('y') {
            println!("❌ Cancelled");
            return Ok(());
        }
    }

    library.remove(&id).await?;
    println!("✅ Removed {}", story.display_title());
    Ok(())
}

/// Summary line for a format, used when listing import results.
pub fn format_label(format: StoryFormat) -> &'static str {
    match format {
        StoryFormat::RawText => "plain text",
        StoryFormat::Structured => "chapters",
    }
}
