use std::sync::Arc;

use tokio::sync::OnceCell;

use super::{ContentDatabase, DatabaseConfig};
use crate::error::{BookshelfError, Result};

/// Opens the content database at most once per session.
///
/// `None` from [`DatabaseSession::open`] means metadata-only mode: the
/// database is disabled or the environment cannot provide it.
#[derive(Debug)]
pub struct DatabaseSession {
    config: Option<DatabaseConfig>,
    handle: OnceCell<Option<Arc<ContentDatabase>>>,
}

impl DatabaseSession {
    pub fn new(config: DatabaseConfig) -> Self {
        Self {
            config: Some(config),
            handle: OnceCell::new(),
        }
    }

    /// A session that never opens a database.
    pub fn disabled() -> Self {
        Self {
            config: None,
            handle: OnceCell::new(),
        }
    }

    /// The cached handle, opening the database on first call.
    ///
    /// Schema and data errors are returned and the next call tries again;
    /// an unavailable store switches the session to metadata-only mode.
    pub async fn open(&self) -> Result<Option<Arc<ContentDatabase>>> {
        self.handle
            .get_or_try_init(|| async {
                let Some(config) = &self.config else {
                    return Ok(None);
                };

                match ContentDatabase::open(config).await {
                    Ok(database) => Ok(Some(Arc::new(database))),
                    Err(BookshelfError::StorageUnavailable { source }) => {
                        tracing::warn!(
                            path = %config.root_path.display(),
                            error = ?source,
                            "Content database unavailable, continuing in metadata-only mode"
                        );
                        Ok(None)
                    }
                    Err(e) => Err(e),
                }
            })
            .await
            .cloned()
    }

    /// Whether the session ended up without a database.
    pub fn is_disabled(&self) -> bool {
        match self.handle.get() {
            Some(handle) => handle.is_none(),
            None => self.config.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn open_returns_the_same_handle() {
        let temp_dir = TempDir::new().unwrap();
        let session = DatabaseSession::new(DatabaseConfig::new(temp_dir.path().join("db")));

        let first = session.open().await.unwrap().unwrap();
        let second = session.open().await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!session.is_disabled());
    }

    #[tokio::test]
    async fn disabled_session_has_no_database() {
        let session = DatabaseSession::disabled();
        assert!(session.is_disabled());
        assert!(session.open().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unusable_location_degrades_to_metadata_only() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, "not a directory").unwrap();

        let session = DatabaseSession::new(DatabaseConfig::new(blocker.join("db")));
        assert!(session.open().await.unwrap().is_none());
        assert!(session.is_disabled());
    }
}
