//! Configuration settings for Oppsum.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub backend: BackendSettings,
    pub transcript: TranscriptSettings,
    pub summary: SummarySettings,
    pub memory: MemorySettings,
    pub prompts: PromptSettings,
}


/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for storing application data.
    pub data_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            data_dir: "~/.oppsum".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Generation backend settings.
///
/// The retry/backoff constants are reference defaults, not invariants; every
/// one of them can be tuned from the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    /// API key. Falls back to the GEMINI_API_KEY environment variable.
    pub api_key: Option<String>,
    /// Base URL of the Generative Language API.
    pub base_url: String,
    /// Model candidates, tried in priority order.
    pub candidates: Vec<String>,
    /// Attempts per candidate before falling back to the next one.
    pub max_attempts: u32,
    /// Base backoff in seconds; attempt n sleeps n times this value.
    pub backoff_base_seconds: u64,
    /// Payloads larger than this are staged via the File API before the call.
    pub upload_threshold_bytes: usize,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            candidates: vec![
                "gemini-2.0-flash".to_string(),
                "gemini-1.5-flash".to_string(),
                "gemini-1.5-pro".to_string(),
            ],
            max_attempts: 3,
            backoff_base_seconds: 40,
            upload_threshold_bytes: 20 * 1024 * 1024,
            timeout_seconds: 300,
        }
    }
}

impl BackendSettings {
    /// Resolve the API key from settings or the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty()))
    }
}

/// Transcript retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Preferred caption language code.
    pub language: String,
    /// Base URL of the timed-text endpoint.
    pub base_url: String,
    /// Per-request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            base_url: "https://www.youtube.com".to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Summary generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummarySettings {
    /// Default summary mode (comprehensive, brief, key-points).
    pub default_mode: String,
    /// Number of keywords requested from the backend.
    pub keyword_count: usize,
    /// Maximum number of transcript segments fed to a timestamp lookup.
    pub timestamp_segment_limit: usize,
}

impl Default for SummarySettings {
    fn default() -> Self {
        Self {
            default_mode: "comprehensive".to_string(),
            keyword_count: 10,
            timestamp_segment_limit: 200,
        }
    }
}

/// Memory log settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySettings {
    /// Persist the memory log to disk after every event.
    pub persist: bool,
    /// Directory for persisted session logs.
    pub log_dir: String,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self {
            persist: false,
            log_dir: "~/.oppsum/logs".to_string(),
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}


impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::OppsumError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("oppsum")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded data directory path.
    pub fn data_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.data_dir)
    }

    /// Get the expanded memory log directory path.
    pub fn log_dir(&self) -> PathBuf {
        Self::expand_path(&self.memory.log_dir)
    }
}
