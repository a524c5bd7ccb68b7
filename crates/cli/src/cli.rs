use std::path::PathBuf;

#[derive(clap::Parser, Debug)]
#[command(name = "bookshelf", about = "Keep and read a local library of stories")]
pub struct Cli {
    /// Override the configured library directory
    #[clap(long, global = true)]
    pub storage_path: Option<PathBuf>,

    /// Show what would be done without making changes
    #[clap(long, global = true)]
    pub dry_run: bool,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(clap::Subcommand, Debug)]
pub enum Commands {
    /// Import story files (plain text, or parsed chapter trees as .json)
    Import {
        #[clap(required = true)]
        files: Vec<PathBuf>,
    },
    /// List stories in the configured sort order
    List,
    /// Show details of a story
    Show {
        /// Story id or unique id prefix
        id: String,
    },
    /// Render a story to HTML
    Read {
        /// Story id or unique id prefix
        id: String,
        /// Chapter to render; defaults to the bookmarked chapter
        #[clap(long)]
        chapter: Option<usize>,
        /// Write the HTML here instead of stdout
        #[clap(long, short)]
        output: Option<PathBuf>,
    },
    /// Remove a story with its content and bookmark
    Remove {
        /// Story id or unique id prefix
        id: String,
        /// Skip confirmation prompt
        #[clap(long)]
        force: bool,
    },
    /// Manage reading positions
    Bookmark {
        #[clap(subcommand)]
        command: BookmarkCommands,
    },
    /// Manage library settings
    Settings {
        #[clap(subcommand)]
        command: SettingsCommands,
    },
    /// Manage configuration
    Config {
        #[clap(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum BookmarkCommands {
    /// Show the saved position of a story
    Get { id: String },
    /// Save a position
    Set {
        id: String,
        chapter: usize,
        /// Element within the chapter; -1 for the chapter start
        #[clap(long, default_value_t = -1, allow_hyphen_values = true)]
        element: i64,
    },
    /// Forget the saved position
    Clear { id: String },
}

#[derive(clap::Subcommand, Debug)]
pub enum SettingsCommands {
    /// Show or change the library sort order
    Sort {
        /// One of: title, author, date-added, last-accessed
        value: Option<String>,
    },
}

#[derive(clap::Subcommand, Debug)]
pub enum ConfigCommands {
    /// Set a configuration value
    Set { key: String, value: String },
    /// Get a configuration value
    Get { key: String },
    /// Show all configuration
    Show,
    /// Reset configuration to defaults
    Reset {
        /// Skip confirmation prompt
        #[clap(long)]
        force: bool,
    },
}
