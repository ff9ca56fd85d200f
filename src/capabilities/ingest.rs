//! Capabilities that acquire the raw material: locator parsing and
//! transcript retrieval.

use super::input_str;
use crate::context::SharedContext;
use crate::error::{OppsumError, Result};
use crate::executor::Capability;
use crate::locator::LocatorResolver;
use crate::planner::Task;
use crate::transcript::TranscriptSource;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::info;

/// Extracts the canonical resource id from a locator.
pub struct ParseLocator {
    resolver: Arc<dyn LocatorResolver>,
}

impl ParseLocator {
    pub fn new(resolver: Arc<dyn LocatorResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Capability for ParseLocator {
    async fn run(&self, task: &Task, ctx: &SharedContext) -> Result<Value> {
        let locator = input_str(task, ctx, "locator")
            .ok_or_else(|| OppsumError::UnsupportedInput("no locator provided".to_string()))?;

        let resource_id = self.resolver.resolve(locator)?;
        info!("Resolved locator to resource id {}", resource_id);

        Ok(json!({
            "resource_id": resource_id,
            "locator": locator,
        }))
    }
}

/// Retrieves the full transcript text and timed segment list.
pub struct FetchTranscript {
    source: Arc<dyn TranscriptSource>,
}

impl FetchTranscript {
    pub fn new(source: Arc<dyn TranscriptSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Capability for FetchTranscript {
    async fn run(&self, task: &Task, ctx: &SharedContext) -> Result<Value> {
        let resource_id = input_str(task, ctx, "resource_id").ok_or_else(|| {
            OppsumError::Transcript("no resource id in context".to_string())
        })?;

        let transcript = self.source.fetch(resource_id).await?;
        info!(
            "Fetched transcript: {} chars, {} segments",
            transcript.full_text.len(),
            transcript.segments.len()
        );

        Ok(json!({
            "resource_id": transcript.resource_id,
            "transcript": transcript.full_text,
            "transcript_length": transcript.full_text.len(),
            "segment_count": transcript.segments.len(),
            "segments": serde_json::to_value(&transcript.segments)?,
        }))
    }
}
