//! Result confirmation capability.

use crate::context::SharedContext;
use crate::error::Result;
use crate::executor::Capability;
use crate::planner::Task;
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

/// No-op confirmation step recording which context keys were accumulated.
///
/// The memory log is the system of record for the run; this capability only
/// confirms what the shared context ended up holding. It always succeeds.
pub struct StoreResult;

#[async_trait]
impl Capability for StoreResult {
    async fn run(&self, _task: &Task, ctx: &SharedContext) -> Result<Value> {
        Ok(json!({
            "stored": true,
            "context_keys": ctx.keys(),
            "stored_at": Utc::now().to_rfc3339(),
        }))
    }
}
