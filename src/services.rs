use crate::errors::AppError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// MIME type assumed when the image host does not send one.
pub const DEFAULT_IMAGE_MIME: &str = "image/jpeg";

/// Raw invoice image pulled from its public URL.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

/// Retrieves invoice images by URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, AppError>;
}

/// Fetches images over plain HTTP(S).
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
}

impl HttpImageFetcher {
    pub fn new() -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, AppError> {
        tracing::debug!("Fetching invoice image: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Fetch(format!("Image request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Fetch(format!(
                "Image host returned status {} for {}",
                response.status(),
                url
            )));
        }

        let mime_type = mime_from_header(
            response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
        );

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AppError::Fetch(format!("Failed to read image body: {}", e)))?;

        tracing::info!("Fetched {} bytes ({})", bytes.len(), mime_type);
        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            mime_type,
        })
    }
}

/// Media type part of a `Content-Type` header, or the JPEG default.
pub fn mime_from_header(header: Option<&str>) -> String {
    header
        .and_then(|v| v.split(';').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| DEFAULT_IMAGE_MIME.to_string())
}
