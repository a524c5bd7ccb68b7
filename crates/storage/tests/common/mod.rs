#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use bookshelf_storage::{
    BookshelfError, Chapter, ChapterNode, DatabaseConfig, DatabaseSession, FetchedImage,
    FileKeyValueStorage, ImageFetcher, Library, LibraryOptions, Result, Story,
};
use tempfile::TempDir;

/// Serves canned images and counts requests.
#[derive(Default)]
pub struct StubFetcher {
    images: HashMap<String, FetchedImage>,
    pub requests: AtomicUsize,
}

impl StubFetcher {
    pub fn with_image(mut self, url: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.images.insert(
            url.to_string(),
            FetchedImage {
                content_type: Some(content_type.to_string()),
                bytes: bytes.to_vec(),
            },
        );
        self
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        // Let concurrent callers interleave between lookup and insert.
        tokio::task::yield_now().await;

        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| BookshelfError::FetchFailed {
                url: url.to_string(),
                source: Some(eyre::eyre!("404 Not Found")),
            })
    }
}

pub struct TestLibrary {
    pub dir: TempDir,
    pub library: Library,
    pub fetcher: Arc<StubFetcher>,
}

pub async fn open_library(fetcher: StubFetcher, options: LibraryOptions) -> TestLibrary {
    let dir = TempDir::new().unwrap();
    let fetcher = Arc::new(fetcher);
    let library = reopen(&dir, fetcher.clone(), options).await;
    TestLibrary {
        dir,
        library,
        fetcher,
    }
}

pub async fn reopen(dir: &TempDir, fetcher: Arc<StubFetcher>, options: LibraryOptions) -> Library {
    let storage = Arc::new(FileKeyValueStorage::new(dir.path().join("local")).unwrap());
    let session = DatabaseSession::new(DatabaseConfig::new(dir.path().join("bookshelf")));
    Library::open(storage, &session, fetcher, options)
        .await
        .unwrap()
}

pub fn illustrated_story(body: &str) -> Story {
    Story::Structured {
        title: "The Long Road".into(),
        author: "A. Writer".into(),
        chapters: vec![Chapter {
            title: Some("Chapter 1".into()),
            contents: vec![
                ChapterNode::text(body),
                ChapterNode::element(
                    "center",
                    vec![ChapterNode::image("https://images.example.com/cover.png")],
                ),
            ],
        }],
    }
}
