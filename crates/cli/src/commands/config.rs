use eyre::Result;
use std::io::{self, Write};

use crate::cli::ConfigCommands;
use crate::config::{CONFIG_KEYS, Config, allowed_values};

pub async fn handle_config_command(cmd: ConfigCommands, dry_run: bool) -> Result<()> {
    match cmd {
        ConfigCommands::Set { key, value } => handle_set_config(key, value, dry_run).await,
        ConfigCommands::Get { key } => handle_get_config(key).await,
        ConfigCommands::Show => handle_show_config().await,
        ConfigCommands::Reset { force } => handle_reset_config(force, dry_run).await,
    }
}

/// What to tell the user after a rejected key or value.
fn config_hint(key: &str) -> String {
    if let Some(values) = allowed_values(key) {
        return format!("💡 Valid values for {}: {}", key, values.join(", "));
    }
    if CONFIG_KEYS.contains(&key) {
        return format!("💡 {} takes free text", key);
    }
    format!("💡 Known keys: {}", CONFIG_KEYS.join(", "))
}

async fn handle_set_config(key: String, value: String, dry_run: bool) -> Result<()> {
    let mut config = Config::load().await?;
    let previous = config.get_value(&key).ok();

    if let Err(e) = config.set_value(&key, &value) {
        println!("❌ {}", e);
        println!("{}", config_hint(&key));
        return Err(e);
    }

    let current = config.get_value(&key)?;
    if previous.as_deref() == Some(current.as_str()) {
        println!("{} is already {}", key, current);
        return Ok(());
    }

    let previous = previous.unwrap_or_default();
    if dry_run {
        println!("Would change {}: {} → {}", key, previous, current);
        return Ok(());
    }

    config.save().await?;
    println!("✅ {}: {} → {}", key, previous, current);
    if key == "storage.path" {
        println!("💡 Stories under the old path are not moved");
    }
    Ok(())
}

async fn handle_get_config(key: String) -> Result<()> {
    let config = Config::load().await?;

    match config.get_value(&key) {
        Ok(value) => println!("{}", value),
        Err(e) => {
            println!("❌ {}", e);
            println!("{}", config_hint(&key));
            return Err(e);
        }
    }

    Ok(())
}

async fn handle_show_config() -> Result<()> {
    let config = Config::load().await?;
    println!("{}", config.show_all());
    println!("\nConfig file: {}", Config::get_config_path().display());
    Ok(())
}

async fn handle_reset_config(force: bool, dry_run: bool) -> Result<()> {
    if dry_run {
        println!("Would reset configuration to defaults");
        return Ok(());
    }

    if !force {
        print!("Reset all configuration to defaults? Your library is kept. (y/N): ");
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if !input.trim().to_lowercase().starts_with('y') {
            println!("❌ Cancelled");
            return Ok(());
        }
    }

    Config::reset().await?;
    println!("✅ Configuration reset to defaults");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_name_values_or_keys() {
        assert_eq!(
            config_hint("import.id_strategy"),
            "💡 Valid values for import.id_strategy: content, random"
        );
        assert_eq!(config_hint("fetch.user_agent"), "💡 fetch.user_agent takes free text");
        assert!(config_hint("import.strategy").contains("import.id_strategy"));
    }
}
