//! The capabilities registered with the executor.
//!
//! Each capability is an independent unit of work: it reads its inputs from
//! the shared context (falling back to the task's seed context), performs its
//! work, and returns a JSON object that the orchestrator merges into the next
//! context snapshot.

mod generate;
mod ingest;
mod store;

pub use generate::{
    parse_keywords, parse_timestamp, ExtractKeywords, GenerateSummary, LocateKeywordTimestamp,
};
pub use ingest::{FetchTranscript, ParseLocator};
pub use store::StoreResult;

use crate::config::{Prompts, SummarySettings};
use crate::context::SharedContext;
use crate::executor::Capability;
use crate::invoker::ToolInvoker;
use crate::locator::LocatorResolver;
use crate::planner::Task;
use crate::transcript::TranscriptSource;
use std::collections::HashMap;
use std::sync::Arc;

/// Read a string input from the shared context, falling back to the task's
/// own seed context.
pub(crate) fn input_str<'a>(task: &'a Task, ctx: &'a SharedContext, key: &str) -> Option<&'a str> {
    ctx.get_str(key)
        .or_else(|| task.context.get(key).and_then(|v| v.as_str()))
}

/// Build the standard capability registry for the summarization pipeline.
pub fn standard_registry(
    resolver: Arc<dyn LocatorResolver>,
    source: Arc<dyn TranscriptSource>,
    invoker: Arc<ToolInvoker>,
    prompts: Prompts,
    summary: &SummarySettings,
) -> HashMap<String, Arc<dyn Capability>> {
    let mut registry: HashMap<String, Arc<dyn Capability>> = HashMap::new();

    registry.insert(
        "locator_parser".to_string(),
        Arc::new(ParseLocator::new(resolver)),
    );
    registry.insert(
        "transcript_source".to_string(),
        Arc::new(FetchTranscript::new(source)),
    );
    registry.insert(
        "summary_generator".to_string(),
        Arc::new(GenerateSummary::new(invoker.clone(), prompts.clone())),
    );
    registry.insert(
        "keyword_extractor".to_string(),
        Arc::new(ExtractKeywords::new(
            invoker.clone(),
            prompts.clone(),
            summary.keyword_count,
        )),
    );
    registry.insert(
        "timestamp_locator".to_string(),
        Arc::new(LocateKeywordTimestamp::new(
            invoker,
            prompts,
            summary.timestamp_segment_limit,
        )),
    );
    registry.insert("result_store".to_string(), Arc::new(StoreResult));

    registry
}
