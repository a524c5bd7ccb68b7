mod cli;
mod commands;
mod config;
mod utils;

use std::path::Path;
use std::sync::Arc;

use bookshelf_storage::{
    DatabaseConfig, DatabaseSession, FileKeyValueStorage, Library, LibraryOptions,
    ReqwestFetcher,
};
use clap::Parser;
use eyre::Result;

use crate::cli::{Cli, Commands};
use crate::commands::*;
use crate::config::Config;

/// Open the library under `root`: descriptors, bookmarks and settings in
/// `local/`, content and images in `bookshelf/`.
async fn open_library(root: &Path, config: &Config) -> Result<Library> {
    let storage = Arc::new(FileKeyValueStorage::new(root.join("local"))?);

    let session = if config.storage.database_enabled {
        DatabaseSession::new(DatabaseConfig::new(root.join("bookshelf")))
    } else {
        DatabaseSession::disabled()
    };

    let fetcher = Arc::new(ReqwestFetcher::with_user_agent(&config.fetch.user_agent)?);
    let options = LibraryOptions {
        id_strategy: config.import.id_strategy,
        warm_images: config.import.warm_images,
    };

    tracing::debug!(root = %root.display(), "Opening library");
    Ok(Library::open(storage, &session, fetcher, options).await?)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let command = match cli.command {
        Commands::Config { command } => return handle_config_command(command, cli.dry_run).await,
        command => command,
    };

    let config = Config::load().await?;
    let root = cli.storage_path.unwrap_or_else(|| config.storage_path());
    let library = open_library(&root, &config).await?;

    match command {
        Commands::Import { files } => handle_import(&library, files, cli.dry_run).await,
        Commands::List => handle_list(&library).await,
        Commands::Show { id } => handle_show(&library, id).await,
        Commands::Read {
            id,
            chapter,
            output,
        } => handle_read(&library, id, chapter, output, cli.dry_run).await,
        Commands::Remove { id, force } => handle_remove(&library, id, force, cli.dry_run).await,
        Commands::Bookmark { command } => {
            handle_bookmark_command(command, &library, cli.dry_run).await
        }
        Commands::Settings { command } => {
            handle_settings_command(command, &library, cli.dry_run).await
        }
        Commands::Config { .. } => unreachable!("config commands return early"),
    }
}
