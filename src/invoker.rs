//! Retry and fallback policy around generation backend calls.
//!
//! A single logical "tool invocation" may fan out into several physical calls:
//! up to `max_attempts` per model candidate, with linear backoff on rate
//! limits, falling through the candidate list in priority order. Any fault
//! that is not a rate limit aborts the invocation immediately — capacity
//! problems are worth waiting out, substantive errors are not.

use crate::backend::{GenerationBackend, PayloadStaging, StagedPayload};
use crate::config::BackendSettings;
use crate::error::{BackendError, OppsumError, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Invokes a generation backend with bounded retry and ordered fallback.
pub struct ToolInvoker {
    backend: Arc<dyn GenerationBackend>,
    staging: Arc<dyn PayloadStaging>,
    candidates: Vec<String>,
    max_attempts: u32,
    backoff_base: Duration,
    upload_threshold: usize,
}

impl ToolInvoker {
    /// Create an invoker with policy constants taken from settings.
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        staging: Arc<dyn PayloadStaging>,
        settings: &BackendSettings,
    ) -> Self {
        Self {
            backend,
            staging,
            candidates: settings.candidates.clone(),
            max_attempts: settings.max_attempts.max(1),
            backoff_base: Duration::from_secs(settings.backoff_base_seconds),
            upload_threshold: settings.upload_threshold_bytes,
        }
    }

    /// Invoke the backend with a prompt and an optional payload.
    ///
    /// Payloads over the upload threshold are staged once before the first
    /// attempt and released exactly once after the final attempt, whether the
    /// invocation succeeded or exhausted every candidate. Smaller payloads are
    /// appended to the prompt inline.
    pub async fn invoke(&self, prompt: &str, payload: Option<&str>) -> Result<String> {
        let (full_prompt, staged) = match payload {
            Some(p) if p.len() > self.upload_threshold => {
                let staged = self.staging.upload(p.as_bytes(), "text/plain").await?;
                (prompt.to_string(), Some(staged))
            }
            Some(p) => (format!("{}\n\n{}", prompt, p), None),
            None => (prompt.to_string(), None),
        };

        let result = self.try_candidates(&full_prompt, staged.as_ref()).await;

        if let Some(staged) = staged {
            if let Err(e) = self.staging.release(&staged).await {
                warn!("Failed to release staged payload {}: {}", staged.name, e);
            }
        }

        result
    }

    async fn try_candidates(
        &self,
        prompt: &str,
        staged: Option<&StagedPayload>,
    ) -> Result<String> {
        let mut last_error: Option<BackendError> = None;

        for model in &self.candidates {
            for attempt in 1..=self.max_attempts {
                match self.backend.generate(model, prompt, staged).await {
                    Ok(text) => return Ok(text),
                    Err(err) if err.is_rate_limit() => {
                        let wait = self.backoff_base * attempt;
                        warn!(
                            "Rate limited on {} (attempt {}/{}), waiting {}s",
                            model,
                            attempt,
                            self.max_attempts,
                            wait.as_secs()
                        );
                        tokio::time::sleep(wait).await;
                        last_error = Some(err);
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            info!("Model {} exhausted, trying next candidate", model);
        }

        Err(last_error.map(Into::into).unwrap_or_else(|| {
            OppsumError::Config("no backend candidates configured".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BackendError;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    struct ScriptedBackend {
        /// (model, prompt) per call, in order.
        calls: Mutex<Vec<(String, String)>>,
        rate_limited: HashSet<String>,
        permanent: HashSet<String>,
    }

    impl ScriptedBackend {
        fn new(rate_limited: &[&str], permanent: &[&str]) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                rate_limited: rate_limited.iter().map(|s| s.to_string()).collect(),
                permanent: permanent.iter().map(|s| s.to_string()).collect(),
            }
        }

        fn calls_for(&self, model: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|(m, _)| m == model)
                .count()
        }
    }

    #[async_trait]
    impl GenerationBackend for ScriptedBackend {
        async fn generate(
            &self,
            model: &str,
            prompt: &str,
            _staged: Option<&StagedPayload>,
        ) -> std::result::Result<String, BackendError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), prompt.to_string()));

            if self.rate_limited.contains(model) {
                Err(BackendError::RateLimited {
                    model: model.to_string(),
                    message: "quota exceeded".to_string(),
                })
            } else if self.permanent.contains(model) {
                Err(BackendError::Permanent {
                    model: model.to_string(),
                    message: "invalid request".to_string(),
                })
            } else {
                Ok(format!("ok:{}", model))
            }
        }
    }

    struct CountingStaging {
        uploads: Mutex<u32>,
        releases: Mutex<u32>,
    }

    impl CountingStaging {
        fn new() -> Self {
            Self {
                uploads: Mutex::new(0),
                releases: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl PayloadStaging for CountingStaging {
        async fn upload(&self, _bytes: &[u8], mime_type: &str) -> Result<StagedPayload> {
            *self.uploads.lock().unwrap() += 1;
            Ok(StagedPayload {
                name: "files/test".to_string(),
                uri: "https://staging.test/files/test".to_string(),
                mime_type: mime_type.to_string(),
            })
        }

        async fn release(&self, _payload: &StagedPayload) -> Result<()> {
            *self.releases.lock().unwrap() += 1;
            Ok(())
        }
    }

    fn settings(candidates: &[&str]) -> BackendSettings {
        BackendSettings {
            candidates: candidates.iter().map(|s| s.to_string()).collect(),
            ..BackendSettings::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_retries_then_falls_back() {
        let backend = Arc::new(ScriptedBackend::new(&["model-a"], &[]));
        let staging = Arc::new(CountingStaging::new());
        let invoker = ToolInvoker::new(
            backend.clone(),
            staging,
            &settings(&["model-a", "model-b"]),
        );

        let start = tokio::time::Instant::now();
        let result = invoker.invoke("prompt", None).await.unwrap();

        assert_eq!(result, "ok:model-b");
        assert_eq!(backend.calls_for("model-a"), 3);
        assert_eq!(backend.calls_for("model-b"), 1);
        // Backoff of 40s, 80s, 120s between the attempts against model-a
        assert_eq!(start.elapsed(), Duration::from_secs(240));
    }

    #[tokio::test(start_paused = true)]
    async fn test_all_candidates_exhausted_surfaces_last_error() {
        let backend = Arc::new(ScriptedBackend::new(&["model-a", "model-b"], &[]));
        let staging = Arc::new(CountingStaging::new());
        let invoker = ToolInvoker::new(
            backend.clone(),
            staging,
            &settings(&["model-a", "model-b"]),
        );

        let err = invoker.invoke("prompt", None).await.unwrap_err();
        assert!(matches!(
            err,
            OppsumError::Backend(BackendError::RateLimited { .. })
        ));
        assert_eq!(backend.calls_for("model-a"), 3);
        assert_eq!(backend.calls_for("model-b"), 3);
    }

    #[tokio::test]
    async fn test_permanent_error_aborts_immediately() {
        let backend = Arc::new(ScriptedBackend::new(&[], &["model-a"]));
        let staging = Arc::new(CountingStaging::new());
        let invoker = ToolInvoker::new(
            backend.clone(),
            staging,
            &settings(&["model-a", "model-b"]),
        );

        let err = invoker.invoke("prompt", None).await.unwrap_err();
        assert!(matches!(
            err,
            OppsumError::Backend(BackendError::Permanent { .. })
        ));
        // No retry, no fallback
        assert_eq!(backend.calls_for("model-a"), 1);
        assert_eq!(backend.calls_for("model-b"), 0);
    }

    #[tokio::test]
    async fn test_small_payload_is_inlined() {
        let backend = Arc::new(ScriptedBackend::new(&[], &[]));
        let staging = Arc::new(CountingStaging::new());
        let invoker = ToolInvoker::new(backend.clone(), staging.clone(), &settings(&["model-a"]));

        invoker.invoke("Summarize this.", Some("tiny payload")).await.unwrap();

        let calls = backend.calls.lock().unwrap();
        assert!(calls[0].1.contains("tiny payload"));
        assert_eq!(*staging.uploads.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_large_payload_staged_once_and_released() {
        let backend = Arc::new(ScriptedBackend::new(&[], &[]));
        let staging = Arc::new(CountingStaging::new());
        let mut cfg = settings(&["model-a"]);
        cfg.upload_threshold_bytes = 8;
        let invoker = ToolInvoker::new(backend.clone(), staging.clone(), &cfg);

        invoker
            .invoke("Summarize this.", Some("a payload well over the threshold"))
            .await
            .unwrap();

        assert_eq!(*staging.uploads.lock().unwrap(), 1);
        assert_eq!(*staging.releases.lock().unwrap(), 1);
        // Payload travels as a staged reference, not inline
        let calls = backend.calls.lock().unwrap();
        assert!(!calls[0].1.contains("threshold"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_staged_payload_released_after_exhaustion() {
        let backend = Arc::new(ScriptedBackend::new(&["model-a"], &[]));
        let staging = Arc::new(CountingStaging::new());
        let mut cfg = settings(&["model-a"]);
        cfg.upload_threshold_bytes = 8;
        let invoker = ToolInvoker::new(backend, staging.clone(), &cfg);

        let result = invoker
            .invoke("Summarize this.", Some("a payload well over the threshold"))
            .await;

        assert!(result.is_err());
        assert_eq!(*staging.uploads.lock().unwrap(), 1);
        assert_eq!(*staging.releases.lock().unwrap(), 1);
    }
}
