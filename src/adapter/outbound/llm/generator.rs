//! [`ScriptGenerator`] backed by an [`Llm`].
//!
//! The model receives the intent together with the conditions the rule
//! table already recognised and must answer with
//! `{"script": "...", "conditions": [...]}`. Anything else is a parse error,
//! which the synthesizer turns into a fallback to rule rendering.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::ScriptDialect;
use crate::error::{Error, Result};
use crate::port::outbound::llm::Llm;
use crate::port::outbound::synthesis::{GeneratedScript, GenerationRequest, ScriptGenerator};

/// [`ScriptGenerator`] that asks an LLM for a script and its conditions.
pub struct LlmScriptGenerator {
    llm: Arc<dyn Llm>,
}

impl LlmScriptGenerator {
    /// Wrap any chat-completion client.
    pub fn new(llm: Arc<dyn Llm>) -> Self {
        Self { llm }
    }

    fn prompt(request: &GenerationRequest<'_>) -> Result<String> {
        let conditions = serde_json::to_string_pretty(request.conditions)?;
        let language = match request.dialect {
            ScriptDialect::Python => "Python 3 using pandas (DataFrame columns: open, high, low, close, volume)",
            ScriptDialect::PineScript => "TradingView Pine Script v5",
        };
        Ok(format!(
            "Stock: {name} ({code})\n\
             User request: {intent}\n\
             Script language: {language}\n\
             Conditions combine with: {combine}\n\
             Recognised conditions (JSON):\n{conditions}\n\n\
             Write a monitoring script implementing these conditions. You may \
             refine the parameters if the request asks for it, but keep the same \
             JSON shape for each condition.\n\
             Answer with exactly one JSON object: \
             {{\"script\": \"<script text>\", \"conditions\": [<conditions>]}}",
            name = request.stock_name,
            code = request.stock_code,
            intent = request.intent,
            combine = request.combine.as_str(),
        ))
    }
}

/// Extract the JSON object from a completion, tolerating code fences and
/// surrounding prose.
fn parse_completion(text: &str) -> Result<GeneratedScript> {
    let start = text.find('{');
    let end = text.rfind('}');
    let body = match (start, end) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Err(Error::Parse("completion contains no JSON object".into())),
    };
    Ok(serde_json::from_str(body)?)
}

#[async_trait]
impl ScriptGenerator for LlmScriptGenerator {
    fn name(&self) -> &'static str {
        self.llm.name()
    }

    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<GeneratedScript> {
        let prompt = Self::prompt(request)?;
        let completion = self.llm.complete(&prompt).await?;
        debug!(
            llm = self.llm.name(),
            stock_code = request.stock_code,
            completion_len = completion.len(),
            "Script completion received"
        );
        parse_completion(&completion)
    }
}
