//! OpenAI LLM client.
//!
//! Provides an implementation of the [`Llm`] trait for the OpenAI
//! Chat Completions API, or any endpoint speaking the same protocol.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::error::{ConfigError, Error, Result};
use crate::port::outbound::llm::Llm;

/// OpenAI Chat Completions API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You write stock-monitoring scripts. \
Reply with a single JSON object and nothing else.";

/// Chat-completions client used to draft monitor scripts.
///
/// Every request carries a fixed system prompt asking for one JSON object.
#[derive(Debug)]
pub struct OpenAi {
    /// Shared HTTP client.
    client: Client,
    /// Completions endpoint, [`DEFAULT_API_URL`] unless overridden.
    api_url: String,
    /// Bearer token sent with each request.
    api_key: String,
    /// Model identifier (e.g., "gpt-4o-mini").
    model: String,
    /// Upper bound on completion tokens.
    max_tokens: usize,
    /// Sampling temperature (0.0 to 2.0).
    temperature: f64,
}

impl OpenAi {
    /// Create a new OpenAI client with explicit configuration.
    #[must_use]
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        max_tokens: usize,
        temperature: f64,
    ) -> Self {
        Self {
            client: Client::new(),
            api_url: DEFAULT_API_URL.to_string(),
            api_key: api_key.into(),
            model: model.into(),
            max_tokens,
            temperature,
        }
    }

    /// Point the client at another chat-completions endpoint.
    ///
    /// # Errors
    ///
    /// Returns an error if `url` is not a valid absolute URL.
    pub fn with_api_url(mut self, url: &str) -> Result<Self> {
        self.api_url = Url::parse(url)?.to_string();
        Ok(self)
    }

    /// Create a client from the `OPENAI_API_KEY` environment variable.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment variable is not set.
    pub fn from_env(model: impl Into<String>, max_tokens: usize, temperature: f64) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingField {
                field: "OPENAI_API_KEY",
            })?;
        Ok(Self::new(api_key, model, max_tokens, temperature))
    }
}

#[derive(Serialize)]
struct Request<'a> {
    model: &'a str,
    max_tokens: usize,
    temperature: f64,
    messages: [Message<'a>; 2],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct Response {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl Response {
    fn into_text(self) -> Result<String> {
        self.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| Error::Parse("completion has no content".into()))
    }
}

#[async_trait]
impl Llm for OpenAi {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = Request {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "Requesting completion");
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| Error::Connection(e.to_string()))?
            .json::<Response>()
            .await?;

        response.into_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_carries_system_and_user_messages() {
        let request = Request {
            model: "gpt-4o-mini",
            max_tokens: 1024,
            temperature: 0.2,
            messages: [
                Message {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                Message {
                    role: "user",
                    content: "金叉时通知我",
                },
            ],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "金叉时通知我");
    }

    #[test]
    fn first_choice_is_returned() {
        let json = r#"{
            "id": "chatcmpl-1",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "first"}},
                {"index": 1, "message": {"role": "assistant", "content": "second"}}
            ]
        }"#;
        let response: Response = serde_json::from_str(json).unwrap();
        assert_eq!(response.into_text().unwrap(), "first");
    }

    #[test]
    fn empty_completion_is_an_error() {
        let response: Response = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(response.into_text().is_err());

        let response: Response =
            serde_json::from_str(r#"{"choices": [{"message": {"content": null}}]}"#).unwrap();
        assert!(response.into_text().is_err());
    }

    #[test]
    fn custom_endpoint_must_be_a_url() {
        let client = OpenAi::new("key", "gpt-4o-mini", 512, 0.0);
        assert!(client.with_api_url("not a url").is_err());
    }
}
