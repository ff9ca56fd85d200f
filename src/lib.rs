//! Oppsum - Transcript Summarization Agent
//!
//! A CLI tool that fetches media transcripts and turns them into structured
//! summaries using a small agentic pipeline.
//!
//! The name "Oppsum" comes from the Norwegian "oppsummering" — a summary.
//!
//! # Overview
//!
//! Oppsum allows you to:
//! - Fetch the transcript of a video or podcast episode
//! - Generate comprehensive, brief, or key-point summaries
//! - Extract ranked keywords from the summary
//! - Look up the timestamp where a topic is first discussed
//! - Inspect every step the agent took via its memory log
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `locator` - Resource locator parsing
//! - `transcript` - Transcript types and retrieval
//! - `backend` - Generation backend abstraction (Gemini)
//! - `invoker` - Retry/fallback policy around backend calls
//! - `planner` - Task plan creation and lifecycle
//! - `executor` - Capability dispatch
//! - `capabilities` - The registered units of work
//! - `memory` - Session-scoped event log
//! - `orchestrator` - Pipeline coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use oppsum::config::Settings;
//! use oppsum::orchestrator::{Orchestrator, PipelineRequest, SummaryMode};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut orchestrator = Orchestrator::new(settings)?;
//!
//!     let request = PipelineRequest {
//!         locator: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
//!         summary_mode: SummaryMode::Brief,
//!     };
//!     let result = orchestrator.run_plan(request).await?;
//!     println!("{}", result.summary);
//!
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod capabilities;
pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod executor;
pub mod invoker;
pub mod locator;
pub mod memory;
pub mod orchestrator;
pub mod planner;
pub mod transcript;

pub use error::{BackendError, OppsumError, Result};
