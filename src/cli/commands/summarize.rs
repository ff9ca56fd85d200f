//! Summarize command implementation.

use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, PipelineRequest, SummaryMode};
use anyhow::Result;
use std::path::PathBuf;

/// Run the summarize command.
pub async fn run_summarize(
    locator: &str,
    mode: Option<String>,
    output: Option<String>,
    timestamps: bool,
    export_memory: Option<String>,
    show_timeline: bool,
    settings: Settings,
) -> Result<()> {
    let mode = mode.unwrap_or_else(|| settings.summary.default_mode.clone());
    let summary_mode = mode
        .parse::<SummaryMode>()
        .map_err(|e| anyhow::anyhow!(e))?;

    let mut orchestrator = Orchestrator::new(settings)?;

    Output::info(&format!("Summarizing {} ({} mode)", locator, summary_mode));
    let result = orchestrator
        .run_plan(PipelineRequest {
            locator: locator.to_string(),
            summary_mode,
        })
        .await?;

    Output::header("Summary");
    println!("{}", result.summary);

    if !result.keywords.is_empty() {
        Output::header("Keywords");
        for keyword in &result.keywords {
            Output::list_item(keyword);
        }
    }

    if timestamps && !result.keywords.is_empty() {
        Output::header("Keyword timestamps");
        for keyword in &result.keywords {
            match orchestrator.locate_keyword(keyword, &result.segments).await {
                Ok(seconds) if seconds >= 0.0 => Output::keyword_timestamp(keyword, seconds),
                Ok(_) => Output::kv(keyword, "not found"),
                Err(e) => {
                    Output::warning(&format!("Timestamp lookup for '{}' failed: {}", keyword, e))
                }
            }
        }
    }

    Output::header("Run");
    Output::kv("resource id", &result.resource_id);
    Output::kv(
        "transcript",
        &format!(
            "{} chars, {} segments",
            result.transcript_length, result.segment_count
        ),
    );
    Output::kv(
        "tasks",
        &format!(
            "{}/{} completed ({})",
            result.plan_summary.completed, result.plan_summary.total,
            result.plan_summary.completion_rate
        ),
    );

    if show_timeline {
        Output::header("Timeline");
        for event in orchestrator.timeline() {
            Output::kv(
                &event.timestamp.format("%H:%M:%S%.3f").to_string(),
                &format!("{} {}", event.event, event.details),
            );
        }
    }

    if let Some(path) = output {
        let path = PathBuf::from(path);
        std::fs::write(&path, serde_json::to_string_pretty(&result)?)?;
        Output::success(&format!("Result written to {}", path.display()));
    }

    if let Some(path) = export_memory {
        let written = orchestrator.export_memory(&PathBuf::from(path))?;
        Output::success(&format!("Memory log exported to {}", written.display()));
    }

    Ok(())
}
