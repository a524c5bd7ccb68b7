//! Cache-or-fetch behaviour of the image cache.

mod common;

use std::sync::Arc;

use bookshelf_storage::{ContentDatabase, DatabaseConfig, ImageCache, ImageRecord};
use common::StubFetcher;
use tempfile::TempDir;

const URL: &str = "https://images.example.com/pony.gif";

async fn cache_with(fetcher: Arc<StubFetcher>) -> (TempDir, Arc<ContentDatabase>, ImageCache) {
    let dir = TempDir::new().unwrap();
    let database = Arc::new(
        ContentDatabase::open(&DatabaseConfig::new(dir.path()))
            .await
            .unwrap(),
    );
    let cache = ImageCache::new(Some(database.clone()), fetcher);
    (dir, database, cache)
}

#[tokio::test]
async fn second_request_is_served_from_cache() {
    let fetcher = Arc::new(StubFetcher::default().with_image(URL, "image/gif", b"GIF89a"));
    let (_dir, _db, cache) = cache_with(fetcher.clone()).await;

    let first = cache.fetch_or_get(URL).await.unwrap();
    let second = cache.fetch_or_get(URL).await.unwrap();

    assert_eq!(first, "data:image/gif;charset=utf-8;base64,R0lGODlh");
    assert_eq!(first, second);
    assert_eq!(fetcher.request_count(), 1);
}

#[tokio::test]
async fn concurrent_misses_store_one_record() {
    let fetcher = Arc::new(StubFetcher::default().with_image(URL, "image/gif", b"GIF89a"));
    let (_dir, database, cache) = cache_with(fetcher.clone()).await;

    let (a, b) = tokio::join!(cache.fetch_or_get(URL), cache.fetch_or_get(URL));
    let a = a.unwrap();
    let b = b.unwrap();

    assert_eq!(a, b);
    assert!(a.starts_with("data:image/gif;"));
    assert_eq!(database.len::<ImageRecord>().await.unwrap(), 1);
    assert_eq!(database.count::<ImageRecord>(URL).await.unwrap(), 1);
}

#[tokio::test]
async fn concurrent_misses_across_tasks() {
    let fetcher = Arc::new(StubFetcher::default().with_image(URL, "image/gif", b"GIF89a"));
    let (_dir, database, cache) = cache_with(fetcher.clone()).await;

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            tokio::spawn(async move { cache.fetch_or_get(URL).await })
        })
        .collect();

    for handle in handles {
        let data = handle.await.unwrap().unwrap();
        assert!(data.ends_with("R0lGODlh"));
    }
    assert_eq!(database.len::<ImageRecord>().await.unwrap(), 1);
}

#[tokio::test]
async fn fetch_failures_propagate_and_store_nothing() {
    let fetcher = Arc::new(StubFetcher::default());
    let (_dir, database, cache) = cache_with(fetcher).await;

    let err = cache.fetch_or_get(URL).await.unwrap_err();
    assert!(matches!(err, bookshelf_storage::BookshelfError::FetchFailed { .. }));
    assert_eq!(database.len::<ImageRecord>().await.unwrap(), 0);
}

#[tokio::test]
async fn metadata_only_mode_returns_original_url() {
    let fetcher = Arc::new(StubFetcher::default().with_image(URL, "image/gif", b"GIF89a"));
    let cache = ImageCache::new(None, fetcher.clone());

    assert_eq!(cache.fetch_or_get(URL).await.unwrap(), URL);
    assert_eq!(cache.get_cached(URL).await.unwrap(), None);
    assert_eq!(cache.warm(vec![URL.to_string()]).await, 0);
    assert_eq!(fetcher.request_count(), 0);
}

#[tokio::test]
async fn warm_counts_only_successes() {
    let fetcher = Arc::new(StubFetcher::default().with_image(URL, "image/gif", b"GIF89a"));
    let (_dir, _db, cache) = cache_with(fetcher).await;

    let cached = cache
        .warm(vec![
            URL.to_string(),
            "https://images.example.com/missing.png".to_string(),
        ])
        .await;
    assert_eq!(cached, 1);
}
