//! Configuration module for Oppsum.

mod prompts;
mod settings;

pub use prompts::{KeywordPrompts, Prompts, SummaryPrompts, TimestampPrompts};
pub use settings::{
    BackendSettings, GeneralSettings, MemorySettings, PromptSettings, Settings, SummarySettings,
    TranscriptSettings,
};
