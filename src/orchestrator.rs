//! Pipeline orchestrator for Oppsum.
//!
//! Drives one run end to end: plan the tasks, execute them strictly in
//! order while threading the shared context between steps, and record every
//! transition in the memory log. A run is fail-fast — the first failed task
//! stops the plan, and a failed run can only be restarted from scratch with
//! a fresh plan and context.

use crate::backend::{GeminiBackend, GeminiStaging};
use crate::capabilities::standard_registry;
use crate::config::{Prompts, Settings};
use crate::context::SharedContext;
use crate::error::{OppsumError, Result};
use crate::executor::Executor;
use crate::invoker::ToolInvoker;
use crate::locator::UrlLocatorResolver;
use crate::memory::{MemoryLog, SessionSummary, TimelineEvent};
use crate::planner::{Plan, Planner, PlanSummary, Task, TaskStatus};
use crate::transcript::{TimedTextSource, TranscriptSegment};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};

/// Summary mode selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum SummaryMode {
    #[default]
    Comprehensive,
    Brief,
    KeyPoints,
}

impl FromStr for SummaryMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "comprehensive" => Ok(SummaryMode::Comprehensive),
            "brief" => Ok(SummaryMode::Brief),
            "key-points" | "key_points" => Ok(SummaryMode::KeyPoints),
            _ => Err(format!("Unknown summary mode: {}", s)),
        }
    }
}

impl std::fmt::Display for SummaryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SummaryMode::Comprehensive => write!(f, "comprehensive"),
            SummaryMode::Brief => write!(f, "brief"),
            SummaryMode::KeyPoints => write!(f, "key-points"),
        }
    }
}

/// A user request for one orchestration run.
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Locator of the media resource (URL or bare id).
    pub locator: String,
    /// Requested summary mode.
    pub summary_mode: SummaryMode,
}

/// Structured artifact produced by a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct FinalResult {
    pub resource_id: String,
    pub transcript_length: usize,
    pub segment_count: usize,
    pub summary: String,
    /// At most ten ranked keywords; may be fewer.
    pub keywords: Vec<String>,
    pub plan_summary: PlanSummary,
    /// Full transcript text, kept for downstream use.
    pub transcript: String,
    /// Timed segments, kept for timestamp lookups.
    pub segments: Vec<TranscriptSegment>,
}

/// The main orchestrator for the Oppsum pipeline.
pub struct Orchestrator {
    planner: Planner,
    executor: Executor,
    memory: MemoryLog,
}

impl Orchestrator {
    /// Create a new orchestrator with production components.
    ///
    /// Fails with a configuration error when no backend credential is
    /// available — a run cannot be half-constructed.
    pub fn new(settings: Settings) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;

        let backend = Arc::new(GeminiBackend::new(&settings.backend)?);
        let staging = Arc::new(GeminiStaging::new(&settings.backend)?);
        let invoker = Arc::new(ToolInvoker::new(backend, staging, &settings.backend));

        let resolver = Arc::new(UrlLocatorResolver::new());
        let source = Arc::new(TimedTextSource::new(&settings.transcript));

        let registry = standard_registry(resolver, source, invoker, prompts, &settings.summary);
        let executor = Executor::new(registry);

        let memory = if settings.memory.persist {
            MemoryLog::with_persistence(&settings.log_dir())
        } else {
            MemoryLog::new()
        };

        Ok(Self {
            planner: Planner::new(),
            executor,
            memory,
        })
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(executor: Executor, memory: MemoryLog) -> Self {
        Self {
            planner: Planner::new(),
            executor,
            memory,
        }
    }

    /// Run the full summarization plan for a request.
    #[instrument(skip(self), fields(locator = %request.locator))]
    pub async fn run_plan(&mut self, request: PipelineRequest) -> Result<FinalResult> {
        self.memory
            .record_user_input(&request.locator, &request.summary_mode.to_string());

        let mut plan = self.planner.create_plan(&request);
        self.memory.record_plan_created(&plan);
        info!("Plan created with {} tasks", plan.tasks().len());

        let mut ctx = SharedContext::seeded([
            ("locator".to_string(), json!(request.locator)),
            (
                "summary_mode".to_string(),
                json!(request.summary_mode.to_string()),
            ),
        ]);

        // Strictly sequential: task n+1 depends on the keys task n wrote
        while !plan.is_complete() {
            let Some(task) = plan.next_runnable().cloned() else {
                break;
            };

            info!("Task {}: {}", task.step, task.description);
            self.memory.record_task_started(&task);
            plan.advance(task.step, TaskStatus::InProgress, None);

            let envelope = self.executor.execute(&task, &ctx).await;

            if envelope.is_success() {
                if let Some(output) = &envelope.output {
                    ctx = ctx.merged(output);
                }
                self.memory.record_task_completed(&task, &envelope);
                plan.advance(task.step, TaskStatus::Completed, Some(envelope));
            } else {
                let error = envelope
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string());
                self.memory.record_task_failed(&task, &error);
                plan.advance(task.step, TaskStatus::Failed, Some(envelope));
                return Err(OppsumError::TaskFailed {
                    action: task.action.clone(),
                    message: error,
                });
            }
        }

        let final_result = Self::collect_result(&ctx, &plan)?;
        self.memory.record_final_result(json!({
            "resource_id": final_result.resource_id,
            "transcript_length": final_result.transcript_length,
            "summary_length": final_result.summary.len(),
            "keyword_count": final_result.keywords.len(),
            "completion_rate": final_result.plan_summary.completion_rate,
        }));

        info!("Run complete for {}", final_result.resource_id);
        Ok(final_result)
    }

    /// Look up the timestamp where a keyword is first discussed.
    ///
    /// Dispatched through the executor like any planned task; a `-1.0`
    /// result means "not found", which is a valid answer, not a fault.
    pub async fn locate_keyword(
        &mut self,
        keyword: &str,
        segments: &[TranscriptSegment],
    ) -> Result<f64> {
        let mut context = Map::new();
        context.insert("keyword".to_string(), json!(keyword));
        context.insert("segments".to_string(), serde_json::to_value(segments)?);
        let task = Task::ad_hoc("locate_keyword_timestamp", "timestamp_locator", context);

        self.memory.record_task_started(&task);
        let envelope = self.executor.execute(&task, &SharedContext::new()).await;

        if envelope.is_success() {
            self.memory.record_task_completed(&task, &envelope);
            Ok(envelope
                .output
                .as_ref()
                .and_then(|o| o["timestamp_seconds"].as_f64())
                .unwrap_or(-1.0))
        } else {
            let error = envelope
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string());
            self.memory.record_task_failed(&task, &error);
            Err(OppsumError::TaskFailed {
                action: task.action.clone(),
                message: error,
            })
        }
    }

    fn collect_result(ctx: &SharedContext, plan: &Plan) -> Result<FinalResult> {
        let segments: Vec<TranscriptSegment> = ctx
            .get("segments")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();

        let keywords: Vec<String> = ctx
            .get("keywords")
            .cloned()
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();

        Ok(FinalResult {
            resource_id: ctx.get_str("resource_id").unwrap_or_default().to_string(),
            transcript_length: ctx
                .get("transcript_length")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as usize,
            segment_count: ctx
                .get("segment_count")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as usize,
            summary: ctx.get_str("summary").unwrap_or_default().to_string(),
            keywords,
            plan_summary: plan.summary(),
            transcript: ctx.get_str("transcript").unwrap_or_default().to_string(),
            segments,
        })
    }

    /// The memory log for this orchestrator's session.
    pub fn memory(&self) -> &MemoryLog {
        &self.memory
    }

    /// Chronological timeline of task execution.
    pub fn timeline(&self) -> Vec<TimelineEvent> {
        self.memory.timeline()
    }

    /// Summary of the current session.
    pub fn session_summary(&self) -> SessionSummary {
        self.memory.session_summary()
    }

    /// Export the memory log to a JSON file.
    pub fn export_memory(&self, path: &Path) -> Result<std::path::PathBuf> {
        self.memory.export(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GenerationBackend, PayloadStaging, StagedPayload};
    use crate::config::{BackendSettings, SummarySettings};
    use crate::error::BackendError;
    use crate::executor::Capability;
    use crate::transcript::{Transcript, TranscriptSource};
    use async_trait::async_trait;
    use std::collections::HashMap;

    /// Backend that answers each prompt kind with a canned response.
    struct RoutedBackend;

    #[async_trait]
    impl GenerationBackend for RoutedBackend {
        async fn generate(
            &self,
            _model: &str,
            prompt: &str,
            _staged: Option<&StagedPayload>,
        ) -> std::result::Result<String, BackendError> {
            if prompt.contains("comma-separated") {
                Ok("rust, async, agents, retries, planning, memory, \
                    summaries, transcripts, keywords, timestamps, logging, tracing"
                    .to_string())
            } else if prompt.contains("start time in seconds") {
                Ok("The answer is 123.45 seconds".to_string())
            } else {
                Ok("A concise mock summary of the episode.".to_string())
            }
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

    struct FixedSource {
        available: bool,
    }

    #[async_trait]
    impl TranscriptSource for FixedSource {
        async fn fetch(&self, resource_id: &str) -> Result<Transcript> {
            if !self.available {
                return Err(OppsumError::Transcript(format!(
                    "no transcript segments available for '{}'",
                    resource_id
                )));
            }
            Ok(Transcript::new(
                resource_id.to_string(),
                vec![
                    TranscriptSegment::new("Welcome to the show".to_string(), 0.0, 4.0),
                    TranscriptSegment::new("Today we discuss Rust".to_string(), 4.0, 6.0),
                ],
            ))
        }
    }

    fn orchestrator(transcript_available: bool) -> Orchestrator {
        let invoker = Arc::new(ToolInvoker::new(
            Arc::new(RoutedBackend),
            Arc::new(NoStaging),
            &BackendSettings::default(),
        ));
        let registry = standard_registry(
            Arc::new(UrlLocatorResolver::new()),
            Arc::new(FixedSource {
                available: transcript_available,
            }),
            invoker,
            Prompts::default(),
            &SummarySettings::default(),
        );
        Orchestrator::with_components(Executor::new(registry), MemoryLog::new())
    }

    fn request() -> PipelineRequest {
        PipelineRequest {
            locator: "https://example.com/watch?id=XYZ123".to_string(),
            summary_mode: SummaryMode::Brief,
        }
    }

    #[tokio::test]
    async fn test_run_plan_end_to_end() {
        let mut orchestrator = orchestrator(true);
        let result = orchestrator.run_plan(request()).await.unwrap();

        assert_eq!(result.resource_id, "XYZ123");
        assert_eq!(result.summary, "A concise mock summary of the episode.");
        assert_eq!(result.keywords.len(), 10);
        assert_eq!(result.keywords[0], "rust");
        assert_eq!(result.segment_count, 2);
        assert!(result.transcript_length > 0);
        assert_eq!(result.plan_summary.total, 5);
        assert_eq!(result.plan_summary.completion_rate, "100.0%");

        // One start + one complete entry per task
        let timeline = orchestrator.timeline();
        assert_eq!(timeline.len(), 10);
        assert_eq!(
            orchestrator.memory().query(Some("final_result")).len(),
            1
        );
    }

    #[tokio::test]
    async fn test_failed_task_stops_the_plan() {
        let mut orchestrator = orchestrator(false);
        let err = orchestrator.run_plan(request()).await.unwrap_err();

        assert!(matches!(err, OppsumError::TaskFailed { .. }));
        assert!(err.to_string().contains("fetch_transcript"));

        // Task 2 failed: start/complete for task 1, start/fail for task 2
        let timeline = orchestrator.timeline();
        assert_eq!(timeline.len(), 4);
        assert_eq!(timeline[3].event, "task_failed");
        // Nothing past the failed task ever started
        assert_eq!(
            orchestrator.memory().query(Some("task_started")).len(),
            2
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_is_run_fatal() {
        let registry: HashMap<String, Arc<dyn Capability>> = HashMap::new();
        let mut orchestrator =
            Orchestrator::with_components(Executor::new(registry), MemoryLog::new());

        let err = orchestrator.run_plan(request()).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_locate_keyword() {
        let mut orchestrator = orchestrator(true);
        let segments = vec![TranscriptSegment::new("about rust".to_string(), 10.0, 5.0)];

        let timestamp = orchestrator.locate_keyword("rust", &segments).await.unwrap();
        assert_eq!(timestamp, 123.45);
    }

    #[test]
    fn test_summary_mode_parsing() {
        assert_eq!(
            "brief".parse::<SummaryMode>().unwrap(),
            SummaryMode::Brief
        );
        assert_eq!(
            "key-points".parse::<SummaryMode>().unwrap(),
            SummaryMode::KeyPoints
        );
        assert_eq!(
            "KEY_POINTS".parse::<SummaryMode>().unwrap(),
            SummaryMode::KeyPoints
        );
        assert!("verbose".parse::<SummaryMode>().is_err());
    }
}
