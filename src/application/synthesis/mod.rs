//! Intent to monitor-draft synthesis.
//!
//! ```text
//! intent ──▶ RuleTable ──▶ conditions ──┬──▶ render(dialect) ──▶ draft
//!                                       └──▶ ScriptGenerator (optional)
//!                                              │ invalid / error
//!                                              └──▶ falls back to render
//! ```
//!
//! An intent no rule recognises fails with `IntentUnrecognized` before any
//! generator is consulted.

pub mod render;
pub mod rules;

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::{CombineMode, Condition, MonitorDraft, ScriptDialect};
use crate::error::{Result, SynthesisError};
use crate::port::inbound::control::{ConditionTemplate, GenerateRequest};
use crate::port::outbound::synthesis::{GeneratedScript, GenerationRequest, ScriptGenerator};

pub use render::{describe, render, ScriptContext};
pub use rules::{ConditionRule, RuleTable};

static EXPLICIT_OR: LazyLock<Regex> =
    LazyLock::new(|| rules::regex(r"(?i)或者|或|任一|任意|\bor\b|\beither\b"));

/// How multiple extracted conditions combine.
///
/// False triggers cost more than missed ones, so anything short of an
/// explicit "or" combines with AND.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinePolicy {
    /// OR when the intent says so (或 / 或者 / 任一 / "or"), otherwise AND.
    #[default]
    ExplicitOr,
    /// Always AND.
    AlwaysAnd,
}

impl CombinePolicy {
    #[must_use]
    pub fn combine_for(self, intent: &str) -> CombineMode {
        match self {
            Self::AlwaysAnd => CombineMode::All,
            Self::ExplicitOr => {
                if EXPLICIT_OR.is_match(intent) {
                    CombineMode::Any
                } else {
                    CombineMode::All
                }
            }
        }
    }
}

/// Turns `(stock, intent, dialect)` into a [`MonitorDraft`].
pub struct Synthesizer {
    rules: RuleTable,
    policy: CombinePolicy,
    default_dialect: ScriptDialect,
    generator: Option<Arc<dyn ScriptGenerator>>,
}

impl Default for Synthesizer {
    fn default() -> Self {
        Self::new(RuleTable::with_defaults(), CombinePolicy::default(), ScriptDialect::default())
    }
}

impl Synthesizer {
    #[must_use]
    pub fn new(rules: RuleTable, policy: CombinePolicy, default_dialect: ScriptDialect) -> Self {
        Self {
            rules,
            policy,
            default_dialect,
            generator: None,
        }
    }

    #[must_use]
    pub fn with_generator(mut self, generator: Arc<dyn ScriptGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    #[must_use]
    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    #[must_use]
    pub fn default_dialect(&self) -> ScriptDialect {
        self.default_dialect
    }

    /// Conditions and combine mode recognised in `intent`.
    ///
    /// # Errors
    ///
    /// Returns [`SynthesisError::IntentUnrecognized`] when no rule matches.
    pub fn classify(&self, intent: &str) -> std::result::Result<(Vec<Condition>, CombineMode), SynthesisError> {
        let conditions = self.rules.extract(intent);
        if conditions.is_empty() {
            return Err(SynthesisError::IntentUnrecognized {
                intent: intent.to_string(),
            });
        }
        let combine = if conditions.len() > 1 {
            self.policy.combine_for(intent)
        } else {
            CombineMode::All
        };
        Ok((conditions, combine))
    }

    /// Rule-only synthesis. Pure: no I/O and no generator.
    ///
    /// # Errors
    ///
    /// Returns `IntentUnrecognized`, or a domain error for an empty stock
    /// code.
    pub fn synthesize(
        &self,
        stock_code: &str,
        stock_name: &str,
        intent: &str,
        dialect: ScriptDialect,
    ) -> Result<MonitorDraft> {
        let (conditions, combine) = self.classify(intent)?;
        let script_text = render(
            dialect,
            &ScriptContext {
                stock_code,
                stock_name,
                intent,
                conditions: &conditions,
                combine,
            },
        );
        let draft = MonitorDraft {
            stock_code: stock_code.trim().to_string(),
            stock_name: stock_name.trim().to_string(),
            intent: intent.to_string(),
            dialect,
            script_text,
            conditions,
            combine,
        };
        draft.validate()?;
        Ok(draft)
    }

    /// Synthesize, consulting the generator when one is configured.
    ///
    /// Generator failures and structurally invalid output are logged and the
    /// rule-rendered draft is returned instead.
    ///
    /// # Errors
    ///
    /// Same as [`Synthesizer::synthesize`].
    pub async fn generate(&self, request: &GenerateRequest) -> Result<MonitorDraft> {
        let dialect = request.dialect.unwrap_or(self.default_dialect);
        let draft = self.synthesize(
            &request.stock_code,
            &request.stock_name,
            &request.intent,
            dialect,
        )?;

        let Some(generator) = &self.generator else {
            return Ok(draft);
        };

        let generation = GenerationRequest {
            stock_code: &draft.stock_code,
            stock_name: &draft.stock_name,
            intent: &draft.intent,
            dialect,
            conditions: &draft.conditions,
            combine: draft.combine,
        };

        let generated = match generator.generate(&generation).await {
            Ok(generated) => generated,
            Err(e) => {
                warn!(generator = generator.name(), error = %e, "Script generation failed, using rule rendering");
                return Ok(draft);
            }
        };

        match validate_generated(&generated) {
            Ok(()) => {
                debug!(
                    generator = generator.name(),
                    conditions = generated.conditions.len(),
                    "Using generated script"
                );
                Ok(MonitorDraft {
                    script_text: generated.script_text,
                    conditions: generated.conditions,
                    ..draft
                })
            }
            Err(e) => {
                warn!(generator = generator.name(), error = %e, "Generated script rejected, using rule rendering");
                Ok(draft)
            }
        }
    }

    #[must_use]
    pub fn templates(&self) -> Vec<ConditionTemplate> {
        self.rules.templates()
    }
}

/// Structural checks on generator output.
///
/// # Errors
///
/// Returns [`SynthesisError::InvalidGeneratedScript`] describing the first
/// problem found.
pub fn validate_generated(generated: &GeneratedScript) -> std::result::Result<(), SynthesisError> {
    if generated.script_text.trim().is_empty() {
        return Err(SynthesisError::InvalidGeneratedScript(
            "script text is empty".into(),
        ));
    }
    if generated.conditions.is_empty() {
        return Err(SynthesisError::InvalidGeneratedScript(
            "no conditions".into(),
        ));
    }
    for condition in &generated.conditions {
        condition
            .validate()
            .map_err(|e| SynthesisError::InvalidGeneratedScript(e.to_string()))?;
    }
    Ok(())
}
