//! Cache-or-fetch retrieval of story images.

use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use url::Url;

use crate::database::ContentDatabase;
use crate::error::{BookshelfError, Result};
use crate::traits::{FetchedImage, ImageFetcher};
use crate::types::ImageRecord;

const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

const IMAGE_PROXY_HOST: &str = "camo.fimfiction.net";

/// Unwrap image-proxy URLs to the image they point at.
///
/// Images are cached under the unwrapped URL, so a proxied and a direct
/// reference to the same image share one record.
pub fn resolve_proxy_url(src: &str) -> String {
    let Ok(url) = Url::parse(src) else {
        return src.to_string();
    };
    if url.scheme() != "https" || url.host_str() != Some(IMAGE_PROXY_HOST) {
        return src.to_string();
    }

    url.query_pairs()
        .find(|(name, _)| name == "url")
        .map(|(_, target)| target.into_owned())
        .unwrap_or_else(|| src.to_string())
}

/// Encode a fetched image as a data URI.
pub fn to_data_uri(image: &FetchedImage) -> String {
    format!(
        "data:{};charset=utf-8;base64,{}",
        image.content_type.as_deref().unwrap_or(FALLBACK_CONTENT_TYPE),
        STANDARD.encode(&image.bytes)
    )
}

/// Bridges remote image URLs to data URIs kept in the `images` collection.
#[derive(Clone)]
pub struct ImageCache {
    database: Option<Arc<ContentDatabase>>,
    fetcher: Arc<dyn ImageFetcher>,
}

impl ImageCache {
    /// `database == None` is metadata-only mode: URLs are returned unchanged.
    pub fn new(database: Option<Arc<ContentDatabase>>, fetcher: Arc<dyn ImageFetcher>) -> Self {
        Self { database, fetcher }
    }

    pub fn is_enabled(&self) -> bool {
        self.database.is_some()
    }

    /// The stored data URI for `url`, if it was cached before.
    pub async fn get_cached(&self, url: &str) -> Result<Option<String>> {
        let Some(database) = &self.database else {
            return Ok(None);
        };
        let url = resolve_proxy_url(url);
        Ok(database
            .get::<ImageRecord>(&url)
            .await?
            .map(|record| record.data))
    }

    /// The cached data URI for `url`, fetching and storing it on a miss.
    pub async fn fetch_or_get(&self, url: &str) -> Result<String> {
        let Some(database) = &self.database else {
            return Ok(url.to_string());
        };
        let key = resolve_proxy_url(url);
        let url = key.as_str();

        if database.count::<ImageRecord>(url).await? > 0 {
            if let Some(record) = database.get::<ImageRecord>(url).await? {
                tracing::debug!(url, "Image cache hit");
                return Ok(record.data);
            }
        }

        tracing::debug!(url, "Image cache miss, fetching");
        let fetched = self.fetcher.fetch(url).await?;
        let record = ImageRecord {
            url: url.to_string(),
            data: to_data_uri(&fetched),
        };

        match database.add(&record).await {
            Ok(()) => Ok(record.data),
            Err(e) if e.is_already_exists() => {
                // Another request cached it between our lookup and insert.
                tracing::debug!(url, "Image was cached concurrently");
                let stored = database.get::<ImageRecord>(url).await?;
                Ok(stored.map(|r| r.data).unwrap_or(record.data))
            }
            Err(e) => Err(e),
        }
    }

    /// Cache every URL, logging failures. Returns how many are now cached.
    pub async fn warm<I>(&self, urls: I) -> usize
    where
        I: IntoIterator<Item = String>,
    {
        if !self.is_enabled() {
            return 0;
        }

        let mut cached = 0;
        for url in urls {
            match self.fetch_or_get(&url).await {
                Ok(_) => cached += 1,
                Err(e) => tracing::warn!(url = %url, error = %e, "Failed to cache image"),
            }
        }
        cached
    }
}

/// Fetches images over HTTP.
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl Default for ReqwestFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }

    pub fn with_user_agent(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| BookshelfError::BackendError {
                source: Some(eyre::eyre!("Failed to build HTTP client: {}", e)),
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage> {
        let failed = |e: reqwest::Error| BookshelfError::FetchFailed {
            url: url.to_string(),
            source: Some(eyre::eyre!(e)),
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(failed)?
            .error_for_status()
            .map_err(failed)?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let bytes = response.bytes().await.map_err(failed)?;

        Ok(FetchedImage {
            content_type,
            bytes: bytes.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proxy_urls_are_unwrapped() {
        assert_eq!(
            resolve_proxy_url(
                "https://camo.fimfiction.net/abc?url=https%3A%2F%2Fi.imgur.com%2Fx.png"
            ),
            "https://i.imgur.com/x.png"
        );
        assert_eq!(
            resolve_proxy_url("https://example.com/a.png?url=elsewhere"),
            "https://example.com/a.png?url=elsewhere"
        );
        assert_eq!(resolve_proxy_url("not a url"), "not a url");
    }

    #[test]
    fn data_uri_uses_declared_content_type() {
        let uri = to_data_uri(&FetchedImage {
            content_type: Some("image/png".into()),
            bytes: vec![1, 2, 3],
        });
        assert_eq!(uri, "data:image/png;charset=utf-8;base64,AQID");
    }

    #[test]
    fn data_uri_falls_back_without_content_type() {
        let uri = to_data_uri(&FetchedImage {
            content_type: None,
            bytes: Vec::new(),
        });
        assert_eq!(uri, "data:application/octet-stream;charset=utf-8;base64,");
    }
}
