//! Prompt templates for Oppsum.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct Prompts {
    pub summary: SummaryPrompts,
    pub keywords: KeywordPrompts,
    pub timestamp: TimestampPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}


/// Prompts for summary generation, one template per summary mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryPrompts {
    pub comprehensive: String,
    pub brief: String,
    pub key_points: String,
}

impl Default for SummaryPrompts {
    fn default() -> Self {
        Self {
            comprehensive: r#"Please provide a comprehensive summary of this transcript. Include:
1. Main topics discussed
2. Key insights and takeaways
3. Important quotes or statements
4. Overall conclusion

Transcript:"#
                .to_string(),

            brief: r#"Provide a brief 2-3 paragraph summary of this transcript, focusing on the main points.

Transcript:"#
                .to_string(),

            key_points: r#"Extract the key points from this transcript as a bulleted list. Focus on the most important insights and actionable takeaways.

Transcript:"#
                .to_string(),
        }
    }
}

/// Prompt for keyword extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeywordPrompts {
    pub user: String,
}

impl Default for KeywordPrompts {
    fn default() -> Self {
        Self {
            user: r#"Analyze the following summary and extract exactly {{count}} semantic keywords that best represent the core concepts, themes, and topics discussed.

Instructions:
- Focus on meaningful concepts and topics, not just frequent words
- Include technical terms, frameworks, and key ideas
- Prioritize multi-word phrases that capture important concepts (e.g., "artificial intelligence", "machine learning")
- Avoid generic words like "the", "is", "very"
- Order by importance/relevance
- Return ONLY the {{count}} keywords as a comma-separated list, nothing else

Summary:
{{summary}}

Keywords (comma-separated):"#
                .to_string(),
        }
    }
}

/// Prompt for locating where a topic is discussed in a transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimestampPrompts {
    pub user: String,
}

impl Default for TimestampPrompts {
    fn default() -> Self {
        Self {
            user: r#"Below is a list of transcript segments with their start times in seconds.
Find the first segment where the topic "{{keyword}}" is substantively discussed.
The topic may be paraphrased rather than mentioned word for word.

Segments:
{{segments}}

Reply with ONLY the start time in seconds of that segment (a single number).
If the topic is never discussed, reply with the word "none"."#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let summary_path = custom_path.join("summary.toml");
            if summary_path.exists() {
                let content = std::fs::read_to_string(&summary_path)?;
                prompts.summary = toml::from_str(&content)?;
            }

            let keywords_path = custom_path.join("keywords.toml");
            if keywords_path.exists() {
                let content = std::fs::read_to_string(&keywords_path)?;
                prompts.keywords = toml::from_str(&content)?;
            }

            let timestamp_path = custom_path.join("timestamp.toml");
            if timestamp_path.exists() {
                let content = std::fs::read_to_string(&timestamp_path)?;
                prompts.timestamp = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}
