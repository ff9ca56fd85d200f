//! Generation backend abstraction.
//!
//! A backend takes a prompt (plus an optional staged payload reference) and
//! returns generated text, or a classified fault. Payload staging is a
//! separate concern: oversized inputs are uploaded once and referenced by
//! handle instead of being inlined into every request.

mod gemini;

pub use gemini::{GeminiBackend, GeminiStaging};

use crate::error::{BackendError, Result};
use async_trait::async_trait;

/// Handle to a payload uploaded to the backend's staging area.
#[derive(Debug, Clone)]
pub struct StagedPayload {
    /// Backend-side resource name, used for release.
    pub name: String,
    /// URI referenced from generation requests.
    pub uri: String,
    /// MIME type the payload was uploaded as.
    pub mime_type: String,
}

/// Trait for text-generation backends.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate text from a prompt against a specific model.
    async fn generate(
        &self,
        model: &str,
        prompt: &str,
        staged: Option<&StagedPayload>,
    ) -> std::result::Result<String, BackendError>;
}

/// Trait for large-payload staging.
#[async_trait]
pub trait PayloadStaging: Send + Sync {
    /// Upload a payload and return a handle to it.
    async fn upload(&self, bytes: &[u8], mime_type: &str) -> Result<StagedPayload>;

    /// Release a previously uploaded payload.
    async fn release(&self, payload: &StagedPayload) -> Result<()>;
}
