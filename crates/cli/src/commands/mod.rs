pub mod bookmark;
pub mod config;
pub mod library;
pub mod settings;

pub use bookmark::handle_bookmark_command;
pub use config::handle_config_command;
pub use library::{handle_import, handle_list, handle_read, handle_remove, handle_show};
pub use settings::handle_settings_command;
