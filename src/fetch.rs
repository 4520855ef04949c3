//! Image fetching and decoding.
//!
//! The controller decodes each dequeued image through an [`ImageFetcher`];
//! the HTTP implementation also resolves `file:` URLs and plain paths so
//! offline page snapshots can point at local fixtures.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use image::RgbaImage;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::error::{AisError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Fetching {url} returned status {status}")]
    Status { url: String, status: StatusCode },
    #[error("Failed to decode {url}: {source}")]
    Decode {
        url: String,
        source: image::ImageError,
    },
    #[error("File not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Fetch and decode the image behind `url` into an RGBA grid.
    async fn fetch(&self, url: &str) -> std::result::Result<RgbaImage, FetchError>;
}

pub struct HttpImageFetcher {
    http: Client,
}

impl HttpImageFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(AisError::Network)?;
        Ok(Self { http })
    }

    async fn fetch_remote(&self, url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }

    fn read_local(url: &str) -> std::result::Result<Vec<u8>, FetchError> {
        let path = url.strip_prefix("file://").unwrap_or(url);
        if !Path::new(path).exists() {
            return Err(FetchError::NotFound(path.to_string()));
        }
        std::fs::read(path).map_err(|_| FetchError::NotFound(path.to_string()))
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<RgbaImage, FetchError> {
        let bytes = if url.starts_with("http://") || url.starts_with("https://") {
            self.fetch_remote(url).await?
        } else {
            Self::read_local(url)?
        };

        let decoded = image::load_from_memory(&bytes).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })?;
        Ok(decoded.to_rgba8())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[tokio::test]
    async fn local_path_round_trips_through_decode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fixture.png");
        let img = RgbaImage::from_pixel(3, 2, Rgba([12, 34, 56, 255]));
        img.save(&path).unwrap();

        let fetcher = HttpImageFetcher::new().unwrap();
        let fetched = fetcher.fetch(path.to_str().unwrap()).await.unwrap();
        assert_eq!(fetched.dimensions(), (3, 2));
        assert_eq!(fetched.get_pixel(0, 0).0, [12, 34, 56, 255]);
    }

    #[tokio::test]
    async fn missing_local_file_reports_not_found() {
        let fetcher = HttpImageFetcher::new().unwrap();
        let err = fetcher.fetch("/nonexistent/image.png").await.unwrap_err();
        assert!(matches!(err, FetchError::NotFound(_)));
    }

    #[tokio::test]
    async fn undecodable_bytes_report_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-an-image.png");
        std::fs::write(&path, b"definitely not pixels").unwrap();

        let fetcher = HttpImageFetcher::new().unwrap();
        let err = fetcher.fetch(path.to_str().unwrap()).await.unwrap_err();
        assert!(matches!(err, FetchError::Decode { .. }));
    }
}
