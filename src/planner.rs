//! Plan creation and task lifecycle tracking.
//!
//! A plan is a fixed-shape ordered task sequence built from a template. Tasks
//! can only move through their lifecycle states; the plan itself never gains,
//! loses, or reorders tasks after creation — extensibility is template-level.

use crate::executor::ResultEnvelope;
use crate::orchestrator::PipelineRequest;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

/// Lifecycle status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::InProgress => write!(f, "in_progress"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A single planned unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Ordinal within the plan, contiguous and strictly increasing.
    pub step: u32,
    /// What the task does.
    pub action: String,
    /// Human-readable description.
    pub description: String,
    /// Name of the capability in the executor's registry.
    pub tool: String,
    /// Current lifecycle status.
    pub status: TaskStatus,
    /// Seed inputs copied from the request.
    pub context: Map<String, Value>,
    /// Result envelope once the task reached a terminal status.
    pub result: Option<ResultEnvelope>,
    /// Last status transition time.
    pub updated_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Build an ad hoc task outside of any plan (e.g., a standalone lookup).
    pub fn ad_hoc(action: &str, tool: &str, context: Map<String, Value>) -> Self {
        Self {
            step: 0,
            action: action.to_string(),
            description: String::new(),
            tool: tool.to_string(),
            status: TaskStatus::Pending,
            context,
            result: None,
            updated_at: None,
        }
    }

    fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Failed)
    }
}

/// Ordered task sequence for one orchestration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    tasks: Vec<Task>,
    created_at: DateTime<Utc>,
}

impl Plan {
    /// The first `Pending` task, or None when every task is terminal.
    pub fn next_runnable(&self) -> Option<&Task> {
        self.tasks.iter().find(|t| t.status == TaskStatus::Pending)
    }

    /// Transition the task matching `step` to a new status.
    ///
    /// A terminal task is never re-executed, and an unknown step is a silent
    /// no-op — the reference behavior — but it is logged so a misconfigured
    /// plan shows up in diagnostics.
    pub fn advance(&mut self, step: u32, status: TaskStatus, result: Option<ResultEnvelope>) {
        match self.tasks.iter_mut().find(|t| t.step == step) {
            Some(task) => {
                if task.is_terminal() {
                    warn!("Ignoring transition for terminal task {}", step);
                    return;
                }
                task.status = status;
                task.updated_at = Some(Utc::now());
                if result.is_some() {
                    task.result = result;
                }
            }
            None => warn!("Ignoring transition for unknown plan step {}", step),
        }
    }

    /// True iff every task completed.
    pub fn is_complete(&self) -> bool {
        self.tasks.iter().all(|t| t.status == TaskStatus::Completed)
    }

    /// All tasks, in step order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    /// When the plan was created.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Statistics over the current plan state.
    pub fn summary(&self) -> PlanSummary {
        let total = self.tasks.len();
        let count = |status: TaskStatus| self.tasks.iter().filter(|t| t.status == status).count();

        let completed = count(TaskStatus::Completed);
        let completion_rate = if total == 0 {
            "0.0%".to_string()
        } else {
            format!("{:.1}%", (completed as f64 / total as f64) * 100.0)
        };

        PlanSummary {
            total,
            completed,
            failed: count(TaskStatus::Failed),
            pending: count(TaskStatus::Pending),
            in_progress: count(TaskStatus::InProgress),
            completion_rate,
        }
    }
}

/// Statistics over a plan's task statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanSummary {
    pub total: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
    pub in_progress: usize,
    pub completion_rate: String,
}

/// Builds execution plans from request templates.
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self
    }

    /// Create the summarization plan for a request.
    ///
    /// Every task is seeded with the request's locator and summary mode so a
    /// capability can fall back to its own task context when the shared
    /// context does not carry a key yet.
    pub fn create_plan(&self, request: &PipelineRequest) -> Plan {
        let seed = Self::seed_context(request);

        let template = [
            (
                "parse_locator",
                "Parse the locator and extract the resource id",
                "locator_parser",
            ),
            (
                "fetch_transcript",
                "Retrieve the transcript and its timed segments",
                "transcript_source",
            ),
            (
                "generate_summary",
                "Generate the summary with the generation backend",
                "summary_generator",
            ),
            (
                "extract_keywords",
                "Extract ranked keywords from the summary",
                "keyword_extractor",
            ),
            (
                "store_result",
                "Record the accumulated results",
                "result_store",
            ),
        ];

        let tasks = template
            .iter()
            .enumerate()
            .map(|(i, (action, description, tool))| Task {
                step: (i + 1) as u32,
                action: action.to_string(),
                description: description.to_string(),
                tool: tool.to_string(),
                status: TaskStatus::Pending,
                context: seed.clone(),
                result: None,
                updated_at: None,
            })
            .collect();

        Plan {
            tasks,
            created_at: Utc::now(),
        }
    }

    fn seed_context(request: &PipelineRequest) -> Map<String, Value> {
        let mut seed = Map::new();
        seed.insert("locator".to_string(), json!(request.locator));
        seed.insert(
            "summary_mode".to_string(),
            json!(request.summary_mode.to_string()),
        );
        seed.insert("requested_at".to_string(), json!(Utc::now().to_rfc3339()));
        seed
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}
