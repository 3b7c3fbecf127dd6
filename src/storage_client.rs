use crate::errors::AppError;
use async_trait::async_trait;
use chrono::Utc;
use regex::Regex;
use std::sync::OnceLock;
use std::time::Duration;
use uuid::Uuid;

/// Object store holding uploaded invoice images.
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Stores `bytes` under a fresh name and returns its public URL.
    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        original_name: Option<&str>,
    ) -> Result<String, AppError>;
}

/// Supabase Storage client writing into a single public bucket.
#[derive(Clone)]
pub struct SupabaseStorage {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    bucket: String,
}

impl SupabaseStorage {
    pub fn new(base_url: String, api_key: String, bucket: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                AppError::Internal(format!("Failed to create storage client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            bucket,
        })
    }

    pub fn public_url(&self, object_name: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url, self.bucket, object_name
        )
    }
}

#[async_trait]
impl ObjectStorage for SupabaseStorage {
    async fn upload(
        &self,
        bytes: Vec<u8>,
        content_type: &str,
        original_name: Option<&str>,
    ) -> Result<String, AppError> {
        let object_name = unique_object_name(original_name);
        let url = format!(
            "{}/storage/v1/object/{}/{}",
            self.base_url, self.bucket, object_name
        );
        tracing::info!(
            "Uploading {} bytes to bucket '{}' as {}",
            bytes.len(),
            self.bucket,
            object_name
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("apikey", &self.api_key)
            .header("Content-Type", content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await
            .map_err(|e| AppError::Storage(format!("Upload request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Storage(format!(
                "Supabase returned {}: {}",
                status, error_text
            )));
        }

        let public_url = self.public_url(&object_name);
        tracing::info!("✓ Uploaded invoice image: {}", public_url);
        Ok(public_url)
    }
}

/// `{unix_millis}-{random}.{ext}`, so repeated uploads of the same file never collide.
pub fn unique_object_name(original_name: Option<&str>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}.{}",
        Utc::now().timestamp_millis(),
        &random[..8],
        file_extension(original_name)
    )
}

/// Lower-cased extension of `name` when it is a short alphanumeric token, else `bin`.
pub fn file_extension(name: Option<&str>) -> String {
    static EXTENSION: OnceLock<Regex> = OnceLock::new();
    let re = EXTENSION.get_or_init(|| {
        Regex::new(r"\.([A-Za-z0-9]{1,8})$").expect("extension pattern is valid")
    });

    name.and_then(|n| re.captures(n.trim()))
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}
