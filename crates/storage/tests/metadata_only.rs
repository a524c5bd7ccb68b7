//! Library behaviour when no content database is available.

mod common;

use std::sync::Arc;

use bookshelf_storage::{
    DatabaseSession, FileKeyValueStorage, Library, LibraryOptions, MemoryKeyValueStorage,
};
use common::{StubFetcher, illustrated_story};
use tempfile::TempDir;

#[tokio::test]
async fn stories_are_readable_for_the_session_only() {
    let dir = TempDir::new().unwrap();
    let storage = Arc::new(FileKeyValueStorage::new(dir.path()).unwrap());
    let fetcher = Arc::new(StubFetcher::default());

    let library = Library::open(
        storage.clone(),
        &DatabaseSession::disabled(),
        fetcher.clone(),
        LibraryOptions::default(),
    )
    .await
    .unwrap();
    assert!(library.is_metadata_only());

    let story = illustrated_story("Offline.");
    let outcome = library.import("road.html", &story).await.unwrap();
    let (_, loaded) = library.load(&outcome.id).await.unwrap();
    assert_eq!(loaded, story);
    assert_eq!(fetcher.request_count(), 0, "images are not cached without a database");

    let again = library.import("road.html", &story).await.unwrap();
    assert!(again.already_existed);
    assert!(!again.content_written);

    let fresh = Library::open(
        storage,
        &DatabaseSession::disabled(),
        fetcher,
        LibraryOptions::default(),
    )
    .await
    .unwrap();
    assert_eq!(fresh.metadata().list().unwrap().len(), 1);
    assert!(fresh.load(&outcome.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn quota_errors_reach_the_caller() {
    let storage = Arc::new(MemoryKeyValueStorage::with_quota(32));
    let library = Library::open(
        storage,
        &DatabaseSession::disabled(),
        Arc::new(StubFetcher::default()),
        LibraryOptions::default(),
    )
    .await
    .unwrap();

    let err = library
        .import("road.html", &illustrated_story("Too big."))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        bookshelf_storage::BookshelfError::QuotaExceeded { .. }
    ));
}
