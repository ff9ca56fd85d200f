//! Transcript types and retrieval.
//!
//! The transcript source is thin I/O glue: given a resource id it returns the
//! full text plus the timed segment list. The pipeline only depends on the
//! `TranscriptSource` trait so tests can substitute a canned source.

use crate::config::TranscriptSettings;
use crate::error::{OppsumError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// A complete transcript with timed segments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    /// Resource id this transcript belongs to.
    pub resource_id: String,
    /// Individual transcript segments with timing.
    pub segments: Vec<TranscriptSegment>,
    /// Full transcript text (concatenated segments).
    pub full_text: String,
}

impl Transcript {
    /// Create a new transcript from segments.
    pub fn new(resource_id: String, segments: Vec<TranscriptSegment>) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");

        Self {
            resource_id,
            segments,
            full_text,
        }
    }
}

/// A single timed segment of a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment text.
    pub text: String,
    /// Start offset in seconds.
    pub start_seconds: f64,
    /// Duration in seconds.
    pub duration_seconds: f64,
}

impl TranscriptSegment {
    pub fn new(text: String, start_seconds: f64, duration_seconds: f64) -> Self {
        Self {
            text,
            start_seconds,
            duration_seconds,
        }
    }
}

/// Trait for transcript providers.
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the transcript for a resource id.
    async fn fetch(&self, resource_id: &str) -> Result<Transcript>;
}

/// Transcript source backed by the public timed-text endpoint.
pub struct TimedTextSource {
    client: reqwest::Client,
    base_url: String,
    language: String,
}

impl TimedTextSource {
    /// Create a source from transcript settings.
    pub fn new(settings: &TranscriptSettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_seconds))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            language: settings.language.clone(),
        }
    }
}

#[async_trait]
impl TranscriptSource for TimedTextSource {
    async fn fetch(&self, resource_id: &str) -> Result<Transcript> {
        let url = format!(
            "{}/api/timedtext?v={}&lang={}&fmt=json3",
            self.base_url, resource_id, self.language
        );

        debug!("Fetching timed text for {}", resource_id);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(OppsumError::Transcript(format!(
                "timed text request for '{}' returned {}",
                resource_id,
                response.status()
            )));
        }

        let body: TimedTextResponse = response.json().await.map_err(|e| {
            OppsumError::Transcript(format!("invalid timed text response: {}", e))
        })?;

        let segments: Vec<TranscriptSegment> = body
            .events
            .into_iter()
            .filter_map(|event| {
                let text = event
                    .segs
                    .iter()
                    .map(|s| s.utf8.as_str())
                    .collect::<String>()
                    .trim()
                    .to_string();
                if text.is_empty() {
                    return None;
                }
                Some(TranscriptSegment::new(
                    text,
                    event.t_start_ms as f64 / 1000.0,
                    event.d_duration_ms.unwrap_or(0) as f64 / 1000.0,
                ))
            })
            .collect();

        if segments.is_empty() {
            return Err(OppsumError::Transcript(format!(
                "no transcript segments available for '{}'",
                resource_id
            )));
        }

        Ok(Transcript::new(resource_id.to_string(), segments))
    }
}

/// Wire format of the json3 timed-text response.
#[derive(Debug, Deserialize)]
struct TimedTextResponse {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(rename = "tStartMs", default)]
    t_start_ms: u64,
    #[serde(rename = "dDurationMs")]
    d_duration_ms: Option<u64>,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}
