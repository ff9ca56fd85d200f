//! Capability dispatch and the task-execution failure boundary.
//!
//! The executor owns a fixed registry of named capabilities and performs no
//! I/O itself. Every invocation — including a missing tool or a capability
//! fault — is normalized into a `ResultEnvelope`; no error propagates past
//! this boundary.

use crate::context::SharedContext;
use crate::error::Result;
use crate::planner::Task;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Outcome of a capability invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeStatus {
    Success,
    Failed,
}

/// Uniform wrapper around every capability invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultEnvelope {
    pub status: EnvelopeStatus,
    pub action: String,
    /// Capability output on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    /// Fault message on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ResultEnvelope {
    pub fn success(action: &str, output: Value) -> Self {
        Self {
            status: EnvelopeStatus::Success,
            action: action.to_string(),
            output: Some(output),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(action: &str, error: String) -> Self {
        Self {
            status: EnvelopeStatus::Failed,
            action: action.to_string(),
            output: None,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == EnvelopeStatus::Success
    }
}

/// A named unit of work the executor can dispatch to.
///
/// Capabilities are pure functions of `(task, context)` apart from the
/// network calls they make; all cross-task state flows through the shared
/// context.
#[async_trait]
pub trait Capability: Send + Sync {
    async fn run(&self, task: &Task, ctx: &SharedContext) -> Result<Value>;
}

/// Dispatches tasks to capabilities by tool name.
pub struct Executor {
    registry: HashMap<String, Arc<dyn Capability>>,
}

impl Executor {
    /// Create an executor with an explicit capability registry.
    pub fn new(registry: HashMap<String, Arc<dyn Capability>>) -> Self {
        Self { registry }
    }

    /// Execute one task against the current shared context.
    ///
    /// Tool resolution is not guaranteed: an unknown tool yields a failed
    /// envelope rather than a panic or error, and so does any fault raised by
    /// the capability itself.
    pub async fn execute(&self, task: &Task, ctx: &SharedContext) -> ResultEnvelope {
        let capability = match self.registry.get(&task.tool) {
            Some(capability) => capability,
            None => {
                return ResultEnvelope::failed(
                    &task.action,
                    format!("tool '{}' not found", task.tool),
                );
            }
        };

        debug!("Dispatching '{}' to tool '{}'", task.action, task.tool);

        match capability.run(task, ctx).await {
            Ok(output) => ResultEnvelope::success(&task.action, output),
            Err(e) => ResultEnvelope::failed(&task.action, e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OppsumError;
    use serde_json::json;

    struct EchoCapability;

    #[async_trait]
    impl Capability for EchoCapability {
        async fn run(&self, task: &Task, _ctx: &SharedContext) -> Result<Value> {
            Ok(json!({"echo": task.action}))
        }
    }

    struct FaultyCapability;

    #[async_trait]
    impl Capability for FaultyCapability {
        async fn run(&self, _task: &Task, _ctx: &SharedContext) -> Result<Value> {
            Err(OppsumError::UnsupportedInput("bad shape".to_string()))
        }
    }

    fn executor() -> Executor {
        let mut registry: HashMap<String, Arc<dyn Capability>> = HashMap::new();
        registry.insert("echo".to_string(), Arc::new(EchoCapability));
        registry.insert("faulty".to_string(), Arc::new(FaultyCapability));
        Executor::new(registry)
    }

    #[tokio::test]
    async fn test_successful_dispatch() {
        let task = Task::ad_hoc("echo_action", "echo", Default::default());
        let envelope = executor().execute(&task, &SharedContext::new()).await;

        assert!(envelope.is_success());
        assert_eq!(envelope.action, "echo_action");
        assert_eq!(envelope.output, Some(json!({"echo": "echo_action"})));
    }

    #[tokio::test]
    async fn test_unknown_tool_yields_failed_envelope() {
        let task = Task::ad_hoc("anything", "no_such_tool", Default::default());
        let envelope = executor().execute(&task, &SharedContext::new()).await;

        assert!(!envelope.is_success());
        assert!(envelope.error.as_deref().unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_capability_fault_is_contained() {
        let task = Task::ad_hoc("parse", "faulty", Default::default());
        let envelope = executor().execute(&task, &SharedContext::new()).await;

        assert!(!envelope.is_success());
        assert!(envelope.error.as_deref().unwrap().contains("bad shape"));
    }
}
