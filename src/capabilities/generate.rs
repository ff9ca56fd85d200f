//! Generation-backed capabilities: summary, keywords, and timestamp lookup.

use super::input_str;
use crate::config::Prompts;
use crate::context::SharedContext;
use crate::error::{OppsumError, Result};
use crate::executor::Capability;
use crate::invoker::ToolInvoker;
use crate::orchestrator::SummaryMode;
use crate::planner::Task;
use crate::transcript::TranscriptSegment;
use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Generates a summary of the transcript in the requested mode.
pub struct GenerateSummary {
    invoker: Arc<ToolInvoker>,
    prompts: Prompts,
}

impl GenerateSummary {
    pub fn new(invoker: Arc<ToolInvoker>, prompts: Prompts) -> Self {
        Self { invoker, prompts }
    }
}

#[async_trait]
impl Capability for GenerateSummary {
    async fn run(&self, task: &Task, ctx: &SharedContext) -> Result<Value> {
        let transcript = input_str(task, ctx, "transcript").unwrap_or("");
        if transcript.is_empty() {
            return Err(OppsumError::UnsupportedInput(
                "transcript text is empty".to_string(),
            ));
        }

        let mode = input_str(task, ctx, "summary_mode")
            .and_then(|m| m.parse::<SummaryMode>().ok())
            .unwrap_or(SummaryMode::Comprehensive);

        let template = match mode {
            SummaryMode::Comprehensive => &self.prompts.summary.comprehensive,
            SummaryMode::Brief => &self.prompts.summary.brief,
            SummaryMode::KeyPoints => &self.prompts.summary.key_points,
        };
        let prompt = self.prompts.render_with_custom(template, &HashMap::new());

        info!("Generating {} summary ({} chars in)", mode, transcript.len());
        let summary = self.invoker.invoke(&prompt, Some(transcript)).await?;

        Ok(json!({
            "summary": summary,
            "summary_mode": mode.to_string(),
            "input_length": transcript.len(),
            "output_length": summary.len(),
        }))
    }
}

/// Extracts ranked keywords from the summary.
pub struct ExtractKeywords {
    invoker: Arc<ToolInvoker>,
    prompts: Prompts,
    count: usize,
}

impl ExtractKeywords {
    pub fn new(invoker: Arc<ToolInvoker>, prompts: Prompts, count: usize) -> Self {
        Self {
            invoker,
            prompts,
            count,
        }
    }
}

#[async_trait]
impl Capability for ExtractKeywords {
    async fn run(&self, task: &Task, ctx: &SharedContext) -> Result<Value> {
        let summary = input_str(task, ctx, "summary").ok_or_else(|| {
            OppsumError::UnsupportedInput("no summary provided for keyword extraction".to_string())
        })?;

        let mut vars = HashMap::new();
        vars.insert("count".to_string(), self.count.to_string());
        vars.insert("summary".to_string(), summary.to_string());
        let prompt = self.prompts.render_with_custom(&self.prompts.keywords.user, &vars);

        let response = self.invoker.invoke(&prompt, None).await?;
        let keywords = parse_keywords(&response, self.count);
        debug!("Extracted {} keywords", keywords.len());

        Ok(json!({
            "keywords": keywords,
            "keyword_count": keywords.len(),
        }))
    }
}

/// Finds the first segment offset where a topic is substantively discussed.
pub struct LocateKeywordTimestamp {
    invoker: Arc<ToolInvoker>,
    prompts: Prompts,
    segment_limit: usize,
}

impl LocateKeywordTimestamp {
    pub fn new(invoker: Arc<ToolInvoker>, prompts: Prompts, segment_limit: usize) -> Self {
        Self {
            invoker,
            prompts,
            segment_limit,
        }
    }
}

#[async_trait]
impl Capability for LocateKeywordTimestamp {
    async fn run(&self, task: &Task, ctx: &SharedContext) -> Result<Value> {
        let keyword = input_str(task, ctx, "keyword").ok_or_else(|| {
            OppsumError::UnsupportedInput("no keyword provided for timestamp lookup".to_string())
        })?;

        let segments_value = ctx
            .get("segments")
            .or_else(|| task.context.get("segments"))
            .cloned()
            .ok_or_else(|| {
                OppsumError::UnsupportedInput("no transcript segments in context".to_string())
            })?;
        let segments: Vec<TranscriptSegment> = serde_json::from_value(segments_value)?;

        // Bounded prefix keeps the prompt within input-size limits
        let listing = segments
            .iter()
            .take(self.segment_limit)
            .map(|s| format!("{:.1}s: {}", s.start_seconds, s.text))
            .collect::<Vec<_>>()
            .join("\n");

        let mut vars = HashMap::new();
        vars.insert("keyword".to_string(), keyword.to_string());
        vars.insert("segments".to_string(), listing);
        let prompt = self.prompts.render_with_custom(&self.prompts.timestamp.user, &vars);

        let response = self.invoker.invoke(&prompt, None).await?;
        let timestamp = parse_timestamp(&response);
        debug!("Timestamp for '{}': {}", keyword, timestamp);

        Ok(json!({
            "keyword": keyword,
            "timestamp_seconds": timestamp,
        }))
    }
}

/// Parse a comma-separated keyword response, keeping at most `max` entries.
///
/// Never pads: a short response yields a short list, and callers must
/// tolerate fewer keywords than requested.
pub fn parse_keywords(response: &str, max: usize) -> Vec<String> {
    response
        .split(',')
        .map(|kw| kw.trim().to_string())
        .filter(|kw| !kw.is_empty())
        .take(max)
        .collect()
}

/// Parse the first numeric token in a response as a timestamp in seconds.
///
/// Returns the `-1.0` sentinel when the response carries no number — a valid
/// "not found" result, not a fault.
pub fn parse_timestamp(response: &str) -> f64 {
    let number = Regex::new(r"\d+(?:\.\d+)?").expect("Invalid regex");
    number
        .find(response)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(-1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GenerationBackend, PayloadStaging, StagedPayload};
    use crate::config::BackendSettings;
    use crate::error::BackendError;
    use std::sync::Mutex;

    struct CannedBackend {
        response: String,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedBackend {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl GenerationBackend for CannedBackend {
        async fn generate(
            &self,
            _model: &str,
            prompt: &str,
            _staged: Option<&StagedPayload>,
        ) -> std::result::Result<String, BackendError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(self.response.clone())
        }
    }

    struct NoStaging;

    #[async_trait]
    impl PayloadStaging for NoStaging {
        async fn upload(&self, _bytes: &[u8], _mime_type: &str) -> Result<StagedPayload> {
            unreachable!("staging should not be used in these tests")
        }

        async fn release(&self, _payload: &StagedPayload) -> Result<()> {
            Ok(())
        }
    }

    fn invoker_for(backend: Arc<CannedBackend>) -> Arc<ToolInvoker> {
        Arc::new(ToolInvoker::new(
            backend,
            Arc::new(NoStaging),
            &BackendSettings::default(),
        ))
    }

    #[test]
    fn test_parse_keywords_truncates_to_max() {
        let response = "ai, ml, rust, tokio, async, retry, backoff, planner, executor, memory, logging, tracing";
        let keywords = parse_keywords(response, 10);
        assert_eq!(keywords.len(), 10);
        assert_eq!(keywords[0], "ai");
        assert_eq!(keywords[9], "memory");
    }

    #[test]
    fn test_parse_keywords_never_pads() {
        let keywords = parse_keywords("alpha, beta,, ", 10);
        assert_eq!(keywords, vec!["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(parse_timestamp("The answer is 123.45 seconds"), 123.45);
        assert_eq!(parse_timestamp("42"), 42.0);
        assert_eq!(parse_timestamp("none"), -1.0);
        assert_eq!(parse_timestamp("no digits here at all"), -1.0);
    }

    #[tokio::test]
    async fn test_generate_summary_rejects_empty_transcript() {
        let backend = Arc::new(CannedBackend::new("a summary"));
        let capability = GenerateSummary::new(invoker_for(backend), Prompts::default());
        let task = Task::ad_hoc("generate_summary", "summary_generator", Default::default());

        let err = capability.run(&task, &SharedContext::new()).await.unwrap_err();
        assert!(err.to_string().contains("transcript text is empty"));
    }

    #[tokio::test]
    async fn test_generate_summary_uses_mode_template() {
        let backend = Arc::new(CannedBackend::new("a brief summary"));
        let capability = GenerateSummary::new(invoker_for(backend.clone()), Prompts::default());
        let ctx = SharedContext::seeded([
            ("transcript".to_string(), json!("some transcript text")),
            ("summary_mode".to_string(), json!("brief")),
        ]);
        let task = Task::ad_hoc("generate_summary", "summary_generator", Default::default());

        let output = capability.run(&task, &ctx).await.unwrap();
        assert_eq!(output["summary"], "a brief summary");
        assert_eq!(output["summary_mode"], "brief");

        let prompts = backend.prompts.lock().unwrap();
        assert!(prompts[0].contains("brief 2-3 paragraph"));
        assert!(prompts[0].contains("some transcript text"));
    }

    #[tokio::test]
    async fn test_extract_keywords_end_to_end() {
        let backend = Arc::new(CannedBackend::new("one, two, three"));
        let capability =
            ExtractKeywords::new(invoker_for(backend), Prompts::default(), 10);
        let ctx = SharedContext::seeded([("summary".to_string(), json!("a summary"))]);
        let task = Task::ad_hoc("extract_keywords", "keyword_extractor", Default::default());

        let output = capability.run(&task, &ctx).await.unwrap();
        assert_eq!(output["keywords"], json!(["one", "two", "three"]));
        assert_eq!(output["keyword_count"], 3);
    }

    #[tokio::test]
    async fn test_locate_timestamp_truncates_segments() {
        let backend = Arc::new(CannedBackend::new("The topic starts at 12.5 seconds"));
        let capability =
            LocateKeywordTimestamp::new(invoker_for(backend.clone()), Prompts::default(), 2);

        let segments = json!([
            {"text": "first", "start_seconds": 0.0, "duration_seconds": 5.0},
            {"text": "second", "start_seconds": 5.0, "duration_seconds": 5.0},
            {"text": "beyond-the-limit", "start_seconds": 10.0, "duration_seconds": 5.0}
        ]);
        let ctx = SharedContext::seeded([
            ("keyword".to_string(), json!("topic")),
            ("segments".to_string(), segments),
        ]);
        let task = Task::ad_hoc("locate_keyword_timestamp", "timestamp_locator", Default::default());

        let output = capability.run(&task, &ctx).await.unwrap();
        assert_eq!(output["timestamp_seconds"], 12.5);

        let prompts = backend.prompts.lock().unwrap();
        assert!(prompts[0].contains("second"));
        assert!(!prompts[0].contains("beyond-the-limit"));
    }
}
