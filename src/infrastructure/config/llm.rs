//! LLM provider configuration.
//!
//! The API key is read from `OPENAI_API_KEY` at runtime, never from the file.

use serde::Deserialize;

/// LLM provider selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAi,
}

/// LLM settings used by the script generator.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub provider: LlmProvider,

    /// Model identifier. Defaults to "gpt-4o-mini".
    pub model: String,

    /// Sampling temperature. Low values keep scripts close to the conditions.
    pub temperature: f64,

    pub max_tokens: usize,

    /// Chat-completions endpoint; the public OpenAI API when absent.
    pub api_url: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::default(),
            model: "gpt-4o-mini".into(),
            temperature: 0.2,
            max_tokens: 2048,
            api_url: None,
        }
    }
}
