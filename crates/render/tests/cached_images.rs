//! Rendering against a real image cache.

use std::sync::Arc;

use async_trait::async_trait;
use bookshelf_render::{Display, Renderer};
use bookshelf_storage::{
    BookshelfError, ContentDatabase, DatabaseConfig, FetchedImage, ImageCache, ImageFetcher,
    Result,
};
use bookshelf_types::{Chapter, ChapterNode};
use tempfile::TempDir;

struct OnePixel;

#[async_trait]
impl ImageFetcher for OnePixel {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        if url.ends_with("pixel.png") {
            Ok(FetchedImage {
                content_type: Some("image/png".into()),
                bytes: vec![0],
            })
        } else {
            Err(BookshelfError::FetchFailed {
                url: url.to_string(),
                source: None,
            })
        }
    }
}

#[tokio::test]
async fn chapter_images_come_from_the_cache() {
    let dir = TempDir::new().unwrap();
    let database = Arc::new(
        ContentDatabase::open(&DatabaseConfig::new(dir.path()))
            .await
            .unwrap(),
    );
    let cache = ImageCache::new(Some(database), Arc::new(OnePixel));

    let chapter = Chapter {
        title: Some("Pictures".into()),
        contents: vec![
            ChapterNode::text("Look..."),
            ChapterNode::image("https://example.com/pixel.png"),
            ChapterNode::image("https://example.com/gone.png"),
        ],
    };

    let rendered = Renderer::new(&cache).render_chapter(&chapter).await;
    assert_eq!(rendered.title.as_deref(), Some("Pictures"));

    match &rendered.body[1] {
        Display::Image { src, loaded, .. } => {
            assert_eq!(src, "data:image/png;charset=utf-8;base64,AA==");
            assert!(loaded);
        }
        other => panic!("expected image, got {other:?}"),
    }
    match &rendered.body[2] {
        Display::Image { src, loaded, .. } => {
            assert_eq!(src, "https://example.com/gone.png");
            assert!(!loaded);
        }
        other => panic!("expected image, got {other:?}"),
    }

    assert_eq!(
        cache
            .get_cached("https://example.com/pixel.png")
            .await
            .unwrap()
            .as_deref(),
        Some("data:image/png;charset=utf-8;base64,AA==")
    );
}

struct Offline;

#[async_trait]
impl ImageFetcher for Offline {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        Err(BookshelfError::FetchFailed {
            url: url.to_string(),
            source: Some(eyre::eyre!("offline")),
        })
    }
}

#[tokio::test]
async fn proxied_image_warmed_online_renders_offline() {
    const PROXIED: &str =
        "https://camo.fimfiction.net/abc?url=https%3A%2F%2Fexample.com%2Fpixel.png";

    let dir = TempDir::new().unwrap();
    let database = Arc::new(
        ContentDatabase::open(&DatabaseConfig::new(dir.path()))
            .await
            .unwrap(),
    );

    let online = ImageCache::new(Some(database.clone()), Arc::new(OnePixel));
    assert_eq!(online.warm(vec![PROXIED.to_string()]).await, 1);

    let offline = ImageCache::new(Some(database), Arc::new(Offline));
    let display = Renderer::new(&offline)
        .render_node(&ChapterNode::image(PROXIED))
        .await;

    match display {
        Display::Image { src, loaded, .. } => {
            assert!(loaded);
            assert_eq!(src, "data:image/png;charset=utf-8;base64,AA==");
        }
        other => panic!("expected image, got {other:?}"),
    }
}
