//! Gemini backend over the Generative Language REST API.

use super::{GenerationBackend, PayloadStaging, StagedPayload};
use crate::config::BackendSettings;
use crate::error::{BackendError, OppsumError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const API_VERSION: &str = "v1beta";

/// Gemini text-generation backend.
pub struct GeminiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiBackend {
    /// Create a backend from settings. Fails when no API key is configured.
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        let api_key = settings.resolve_api_key().ok_or_else(|| {
            OppsumError::Config(
                "Gemini API key required. Set GEMINI_API_KEY or backend.api_key".to_string(),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

/// Classify an HTTP failure status into a backend fault.
fn classify_status(model: &str, status: reqwest::StatusCode, message: String) -> BackendError {
    let model = model.to_string();
    if status.as_u16() == 429 || message.contains("RESOURCE_EXHAUSTED") {
        BackendError::RateLimited { model, message }
    } else if status.is_server_error() {
        BackendError::Transient { model, message }
    } else {
        BackendError::Permanent { model, message }
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        staged: Option<&StagedPayload>,
    ) -> std::result::Result<String, BackendError> {
        let url = format!(
            "{}/{}/models/{}:generateContent?key={}",
            self.base_url, API_VERSION, model, self.api_key
        );

        let mut parts = vec![Part {
            text: Some(prompt.to_string()),
            file_data: None,
        }];
        if let Some(payload) = staged {
            parts.push(Part {
                text: None,
                file_data: Some(FileData {
                    mime_type: payload.mime_type.clone(),
                    file_uri: payload.uri.clone(),
                }),
            });
        }

        let request = GenerateContentRequest {
            contents: vec![Content { parts }],
        };

        debug!("Calling {} ({} byte prompt)", model, prompt.len());

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::Transient {
                model: model.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(model, status, body));
        }

        let body: GenerateContentResponse =
            response.json().await.map_err(|e| BackendError::Permanent {
                model: model.to_string(),
                message: format!("invalid generation response: {}", e),
            })?;

        let text = body.text();
        if text.is_empty() {
            return Err(BackendError::Permanent {
                model: model.to_string(),
                message: "empty generation response".to_string(),
            });
        }

        Ok(text)
    }
}

/// Payload staging via the Gemini File API.
pub struct GeminiStaging {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl GeminiStaging {
    /// Create a staging client from settings. Fails when no API key is configured.
    pub fn new(settings: &BackendSettings) -> Result<Self> {
        let api_key = settings.resolve_api_key().ok_or_else(|| {
            OppsumError::Config(
                "Gemini API key required. Set GEMINI_API_KEY or backend.api_key".to_string(),
            )
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl PayloadStaging for GeminiStaging {
    async fn upload(&self, bytes: &[u8], mime_type: &str) -> Result<StagedPayload> {
        let url = format!(
            "{}/upload/{}/files?key={}",
            self.base_url, API_VERSION, self.api_key
        );

        debug!("Uploading {} bytes to staging area", bytes.len());

        let response = self
            .client
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header("Content-Type", mime_type.to_string())
            .body(bytes.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(OppsumError::Config(format!(
                "payload upload failed with status {}",
                response.status()
            )));
        }

        let body: UploadResponse = response.json().await?;

        Ok(StagedPayload {
            name: body.file.name,
            uri: body.file.uri,
            mime_type: mime_type.to_string(),
        })
    }

    async fn release(&self, payload: &StagedPayload) -> Result<()> {
        let url = format!(
            "{}/{}/{}?key={}",
            self.base_url, API_VERSION, payload.name, self.api_key
        );

        self.client.delete(&url).send().await?.error_for_status()?;
        Ok(())
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(rename = "fileData", skip_serializing_if = "Option::is_none")]
    file_data: Option<FileData>,
}

#[derive(Debug, Serialize)]
struct FileData {
    #[serde(rename = "mimeType")]
    mime_type: String,
    #[serde(rename = "fileUri")]
    file_uri: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .map(|c| {
                c.content
                    .parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default()
            .trim()
            .to_string()
    }
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    file: UploadedFile,
}

#[derive(Debug, Deserialize)]
struct UploadedFile {
    name: String,
    uri: String,
}
