//! Session-scoped memory log.
//!
//! An append-only event recorder that gives full observability into what the
//! agent did and when. Memory is an observability aid, not the system of
//! record: recording never fails, and persistence problems are demoted to
//! diagnostics.

use crate::executor::ResultEnvelope;
use crate::planner::{Plan, Task};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

/// Lifecycle event types that make up the execution timeline.
const TIMELINE_EVENTS: &[&str] = &["task_started", "task_completed", "task_failed"];

/// One recorded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub session_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub data: Value,
}

/// A timeline view of a lifecycle event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEvent {
    pub timestamp: DateTime<Utc>,
    pub event: String,
    pub details: Value,
}

/// Statistics over a session's recorded events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub total_events: usize,
    pub event_breakdown: BTreeMap<String, usize>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Append-only event recorder for one orchestration run.
pub struct MemoryLog {
    session_id: Uuid,
    entries: Vec<MemoryEntry>,
    persist_path: Option<PathBuf>,
}

impl MemoryLog {
    /// Create an in-memory log with a fresh session id.
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            entries: Vec::new(),
            persist_path: None,
        }
    }

    /// Create a log that persists to `<dir>/<session_id>.json` after every event.
    pub fn with_persistence(dir: &Path) -> Self {
        let session_id = Uuid::new_v4();
        Self {
            session_id,
            entries: Vec::new(),
            persist_path: Some(dir.join(format!("{}.json", session_id))),
        }
    }

    /// The session id, fixed for the lifetime of this log.
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Append one event. Never fails; persistence faults are only logged.
    pub fn record(&mut self, event_type: &str, data: Value) {
        self.entries.push(MemoryEntry {
            session_id: self.session_id,
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            data,
        });

        if self.persist_path.is_some() {
            if let Err(e) = self.save() {
                warn!("Failed to persist memory log: {}", e);
            }
        }
    }

    pub fn record_user_input(&mut self, locator: &str, summary_mode: &str) {
        self.record(
            "user_input",
            json!({"locator": locator, "summary_mode": summary_mode}),
        );
    }

    pub fn record_plan_created(&mut self, plan: &Plan) {
        let tasks: Vec<Value> = plan
            .tasks()
            .iter()
            .map(|t| json!({"step": t.step, "action": t.action}))
            .collect();
        self.record(
            "plan_created",
            json!({
                "total_tasks": plan.tasks().len(),
                "created_at": plan.created_at().to_rfc3339(),
                "tasks": tasks,
            }),
        );
    }

    pub fn record_task_started(&mut self, task: &Task) {
        self.record(
            "task_started",
            json!({"step": task.step, "action": task.action, "tool": task.tool}),
        );
    }

    pub fn record_task_completed(&mut self, task: &Task, envelope: &ResultEnvelope) {
        let result_keys: Vec<String> = envelope
            .output
            .as_ref()
            .and_then(|v| v.as_object())
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default();
        self.record(
            "task_completed",
            json!({
                "step": task.step,
                "action": task.action,
                "result_keys": result_keys,
            }),
        );
    }

    pub fn record_task_failed(&mut self, task: &Task, error: &str) {
        self.record(
            "task_failed",
            json!({"step": task.step, "action": task.action, "error": error}),
        );
    }

    pub fn record_final_result(&mut self, data: Value) {
        self.record("final_result", data);
    }

    /// Entries in append order, optionally filtered by event type.
    pub fn query(&self, event_type: Option<&str>) -> Vec<&MemoryEntry> {
        self.entries
            .iter()
            .filter(|e| event_type.is_none_or(|t| e.event_type == t))
            .collect()
    }

    /// Chronological timeline of task lifecycle events only.
    pub fn timeline(&self) -> Vec<TimelineEvent> {
        self.entries
            .iter()
            .filter(|e| TIMELINE_EVENTS.contains(&e.event_type.as_str()))
            .map(|e| TimelineEvent {
                timestamp: e.timestamp,
                event: e.event_type.clone(),
                details: e.data.clone(),
            })
            .collect()
    }

    /// Summary of the current session.
    pub fn session_summary(&self) -> SessionSummary {
        let mut event_breakdown: BTreeMap<String, usize> = BTreeMap::new();
        for entry in &self.entries {
            *event_breakdown.entry(entry.event_type.clone()).or_insert(0) += 1;
        }

        SessionSummary {
            session_id: self.session_id,
            total_events: self.entries.len(),
            event_breakdown,
            start_time: self.entries.first().map(|e| e.timestamp),
            end_time: self.entries.last().map(|e| e.timestamp),
        }
    }

    /// Export the session summary plus the full log as JSON.
    pub fn export(&self, path: &Path) -> crate::error::Result<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let export = json!({
            "session_summary": self.session_summary(),
            "memory": self.entries,
        });
        std::fs::write(path, serde_json::to_string_pretty(&export)?)?;
        Ok(path.to_path_buf())
    }

    /// Drop all entries and start a fresh session.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.session_id = Uuid::new_v4();
        if let Some(path) = &self.persist_path {
            if let Some(dir) = path.parent() {
                self.persist_path = Some(dir.join(format!("{}.json", self.session_id)));
            }
        }
    }

    fn save(&self) -> crate::error::Result<()> {
        let path = self.persist_path.as_ref().expect("persistence enabled");
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(&self.entries)?)?;
        Ok(())
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new()
    }
}
