use crate::errors::AppError;
use crate::services::FetchedImage;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Vision model that turns an invoice image into a JSON payload.
///
/// Implementations return whatever the model produced; checking it against
/// the field contract is the caller's job.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        image: &FetchedImage,
        instructions: &str,
        schema: &Value,
    ) -> Result<Value, AppError>;
}

/// Client for the Gemini `generateContent` API in structured-output mode.
#[derive(Clone)]
pub struct GeminiExtractor {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

impl GeminiExtractor {
    /// Creates a new `GeminiExtractor`.
    ///
    /// # Arguments
    ///
    /// * `base_url` - API root, e.g. `https://generativelanguage.googleapis.com`.
    /// * `model` - Model name, e.g. `gemini-2.5-flash`.
    /// * `api_key` - Google API key.
    pub fn new(base_url: String, model: String, api_key: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| {
                AppError::Internal(format!("Failed to create Gemini client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
        })
    }

    fn request_body(image: &FetchedImage, instructions: &str, schema: &Value) -> Value {
        json!({
            "contents": [{
                "role": "user",
                "parts": [
                    { "text": instructions },
                    {
                        "inline_data": {
                            "mime_type": image.mime_type,
                            "data": STANDARD.encode(&image.bytes)
                        }
                    }
                ]
            }],
            "generationConfig": {
                "temperature": 0,
                "responseMimeType": "application/json",
                "responseSchema": schema
            }
        })
    }
}

#[async_trait]
impl Extractor for GeminiExtractor {
    async fn extract(
        &self,
        image: &FetchedImage,
        instructions: &str,
        schema: &Value,
    ) -> Result<Value, AppError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        tracing::info!(
            "🤖 Sending {} byte {} image to {}",
            image.bytes.len(),
            image.mime_type,
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&Self::request_body(image, instructions, schema))
            .send()
            .await
            .map_err(|e| AppError::Extraction(format!("Gemini request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::Extraction(format!(
                "Gemini returned {}: {}",
                status, error_text
            )));
        }

        let body: GenerateContentResponse = response.json().await.map_err(|e| {
            AppError::Extraction(format!("Failed to parse Gemini response: {}", e))
        })?;

        let candidate = body
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| AppError::Extraction("Gemini returned no candidates".to_string()))?;

        let text = candidate
            .content
            .into_iter()
            .flat_map(|c| c.parts)
            .find_map(|p| p.text)
            .ok_or_else(|| {
                AppError::Extraction(format!(
                    "Gemini candidate has no text (finishReason: {})",
                    candidate.finish_reason.as_deref().unwrap_or("unknown")
                ))
            })?;

        let payload: Value = serde_json::from_str(strip_code_fence(&text)).map_err(|e| {
            AppError::Extraction(format!("Gemini output is not valid JSON: {}", e))
        })?;

        tracing::debug!("Gemini payload: {}", payload);
        Ok(payload)
    }
}

/// Removes a surrounding ```json fence, which some models emit even in JSON mode.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    match trimmed.strip_prefix("```") {
        Some(rest) => rest
            .trim_start_matches("json")
            .trim_end()
            .trim_end_matches("```")
            .trim(),
        None => trimmed,
    }
}
