use bookshelf_storage::{Library, SortOrder};
use eyre::Result;

use crate::cli::SettingsCommands;

pub async fn handle_settings_command(
    cmd: SettingsCommands,
    library: &Library,
    dry_run: bool,
) -> Result<()> {
    match cmd {
        SettingsCommands::Sort { value: None } => {
            let settings = library.settings().load()?;
            println!("Sort: {}", settings.sort.name());
            let choices: Vec<_> = SortOrder::ALL.iter().map(SortOrder::name).collect();
            println!("Available: {}", choices.join(", "));
        }
        SettingsCommands::Sort { value: Some(value) } => {
            let order = value.parse::<SortOrder>().map_err(|e| eyre::eyre!(e))?;
            if dry_run {
                println!("Would sort by {}", order.name());
                return Ok(());
            }
            let mut settings = library.settings().load()?;
            settings.sort = order;
            library.settings().save(&settings)?;
            println!("✅ Sorting by {}", order.name());
        }
    }
    Ok(())
}
