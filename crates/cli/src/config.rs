use bookshelf_storage::IdStrategy;
use directories::ProjectDirs;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub import: ImportConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StorageConfig {
    pub path: String,
    /// When false, only descriptors are persisted and images are never cached.
    pub database_enabled: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ImportConfig {
    pub id_strategy: IdStrategy,
    pub warm_images: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct FetchConfig {
    pub user_agent: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: get_default_data_dir()
                .join("library")
                .to_string_lossy()
                .to_string(),
            database_enabled: true,
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            id_strategy: IdStrategy::ContentDerived,
            warm_images: true,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("bookshelf/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Every key accepted by [`Config::get_value`] and [`Config::set_value`].
pub const CONFIG_KEYS: &[&str] = &[
    "storage.path",
    "storage.database_enabled",
    "import.id_strategy",
    "import.warm_images",
    "fetch.user_agent",
];

/// Accepted values for keys that take a fixed set, for error hints.
pub fn allowed_values(key: &str) -> Option<&'static [&'static str]> {
    match key {
        "storage.database_enabled" | "import.warm_images" => Some(&["true", "false"]),
        "import.id_strategy" => Some(&["content", "random"]),
        _ => None,
    }
}

fn parse_bool(value: &str) -> Result<bool> {
    value
        .parse::<bool>()
        .map_err(|_| eyre::eyre!("Invalid boolean value: {}", value))
}

fn id_strategy_name(strategy: IdStrategy) -> &'static str {
    match strategy {
        IdStrategy::ContentDerived => "content",
        IdStrategy::Random => "random",
    }
}

impl Config {
    pub fn get_config_path() -> PathBuf {
        get_default_config_dir().join("config.json")
    }

    pub fn storage_path(&self) -> PathBuf {
        PathBuf::from(&self.storage.path)
    }

    pub async fn load() -> Result<Self> {
        Self::load_from(&Self::get_config_path()).await
    }

    /// Read the config at `config_path`, writing defaults there if it is missing.
    pub async fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            let default_config = Self::default();
            default_config.save_to(config_path).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(config_path).await?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    pub async fn save(&self) -> Result<()> {
        self.save_to(&Self::get_config_path()).await
    }

    pub async fn save_to(&self, config_path: &Path) -> Result<()> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, content).await?;
        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = key.split('.').collect();

        match parts.as_slice() {
            ["storage", "path"] => {
                if value.trim().is_empty() {
                    return Err(eyre::eyre!("Storage path cannot be empty"));
                }
                self.storage.path = value.to_string();
            }
            ["storage", "database_enabled"] => {
                self.storage.database_enabled = parse_bool(value)?;
            }
            ["import", "id_strategy"] => {
                self.import.id_strategy = value.parse::<IdStrategy>().map_err(|e| eyre::eyre!(e))?;
            }
            ["import", "warm_images"] => {
                self.import.warm_images = parse_bool(value)?;
            }
            ["fetch", "user_agent"] => {
                self.fetch.user_agent = value.to_string();
            }
            _ => {
                return Err(eyre::eyre!("Unknown configuration key: {}", key));
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Result<String> {
        let parts: Vec<&str> = key.split('.').collect();

        let value = match parts.as_slice() {
            ["storage", "path"] => self.storage.path.clone(),
            ["storage", "database_enabled"] => self.storage.database_enabled.to_string(),
            ["import", "id_strategy"] => id_strategy_name(self.import.id_strategy).to_string(),
            ["import", "warm_images"] => self.import.warm_images.to_string(),
            ["fetch", "user_agent"] => self.fetch.user_agent.clone(),
            _ => {
                return Err(eyre::eyre!("Unknown configuration key: {}", key));
            }
        };

        Ok(value)
    }

    pub fn show_all(&self) -> String {
        format!(
            "Configuration:\n\
             Storage:\n\
             ├─ path: {}\n\
             └─ database_enabled: {}\n\
             Import:\n\
             ├─ id_strategy: {}\n\
             └─ warm_images: {}\n\
             Fetch:\n\
             └─ user_agent: {}",
            self.storage.path,
            self.storage.database_enabled,
            id_strategy_name(self.import.id_strategy),
            self.import.warm_images,
            self.fetch.user_agent,
        )
    }

    pub async fn reset() -> Result<Self> {
        let config = Self::default();
        config.save().await?;
        Ok(config)
    }
}

/// Get the default configuration directory
fn get_default_config_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("org", "bookshelf", "bookshelf") {
        proj_dirs.config_dir().to_path_buf()
    } else {
        // Fallback to current directory if we can't determine project dirs
        PathBuf::from(".bookshelf").join("config")
    }
}

/// Get the default data directory
pub fn get_default_data_dir() -> PathBuf {
    if let Some(proj_dirs) = ProjectDirs::from("org", "bookshelf", "bookshelf") {
        proj_dirs.data_dir().to_path_buf()
    } else {
        PathBuf::from(".bookshelf").join("data")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn set_and_get_round_trip() {
        let mut config = Config::default();
        config.set_value("storage.database_enabled", "false").unwrap();
        config.set_value("import.id_strategy", "random").unwrap();
        config.set_value("fetch.user_agent", "test-agent").unwrap();

        assert_eq!(config.get_value("storage.database_enabled").unwrap(), "false");
        assert_eq!(config.get_value("import.id_strategy").unwrap(), "random");
        assert_eq!(config.get_value("fetch.user_agent").unwrap(), "test-agent");
    }

    #[test]
    fn invalid_values_and_keys_are_rejected() {
        let mut config = Config::default();
        assert!(config.set_value("import.warm_images", "maybe").is_err());
        assert!(config.set_value("import.id_strategy", "sequential").is_err());
        assert!(config.set_value("storage.path", "  ").is_err());
        assert!(config.set_value("nope", "x").is_err());
        assert!(config.get_value("storage").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn every_listed_key_is_readable() {
        let config = Config::default();
        for key in CONFIG_KEYS {
            assert!(config.get_value(key).is_ok(), "{key}");
        }
        assert_eq!(allowed_values("import.id_strategy"), Some(&["content", "random"][..]));
        assert_eq!(allowed_values("fetch.user_agent"), None);
    }

    #[tokio::test]
    async fn load_from_writes_defaults_then_reads_back() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.json");

        let created = Config::load_from(&path).await.unwrap();
        assert!(path.exists());

        let mut changed = created.clone();
        changed.set_value("import.warm_images", "false").unwrap();
        changed.save_to(&path).await.unwrap();

        let loaded = Config::load_from(&path).await.unwrap();
        assert!(!loaded.import.warm_images);
        assert_eq!(loaded.storage, created.storage);
    }

    #[tokio::test]
    async fn missing_sections_take_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"storage":{"path":"/tmp/books","database_enabled":false}}"#,
        )
        .await
        .unwrap();

        let config = Config::load_from(&path).await.unwrap();
        assert_eq!(config.storage.path, "/tmp/books");
        assert!(!config.storage.database_enabled);
        assert_eq!(config.import, ImportConfig::default());
    }
}
