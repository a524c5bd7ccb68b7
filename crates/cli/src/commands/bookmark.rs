use bookshelf_storage::Library;
use eyre::Result;

use crate::cli::BookmarkCommands;
use crate::utils::resolve_story_id;

pub async fn handle_bookmark_command(
    cmd: BookmarkCommands,
    library: &Library,
    dry_run: bool,
) -> Result<()> {
    let stories = library.metadata().list()?;
    match cmd {
        BookmarkCommands::Get { id } => {
            let id = resolve_story_id(&id, &stories)?;
            let bookmark = library.bookmarks().load(&id)?;
            println!(
                "{}: chapter {}, element {}",
                bookmark.id,
                bookmark.chapter_index + 1,
                bookmark.element_index
            );
        }
        BookmarkCommands::Set {
            id,
            chapter,
            element,
        } => {
            let id = resolve_story_id(&id, &stories)?;
            if chapter == 0 {
                return Err(eyre::eyre!("Chapters are numbered from 1"));
            }
            if element < -1 {
                return Err(eyre::eyre!("Element index must be -1 or greater"));
            }
            if dry_run {
                println!("Would bookmark {} at chapter {}", id, chapter);
                return Ok(());
            }
            library.bookmarks().save(&id, chapter - 1, element)?;
            println!("✅ Bookmarked {} at chapter {}", id, chapter);
        }
        BookmarkCommands::Clear { id } => {
            let id = resolve_story_id(&id, &stories)?;
            if dry_run {
                println!("Would clear bookmark for {}", id);
                return Ok(());
            }
            library.bookmarks().delete(&id)?;
            println!("✅ Cleared bookmark for {}", id);
        }
    }
    Ok(())
}
