//! Script generation port.
//!
//! Generation may be delegated to a generative model. The engine validates
//! whatever comes back and never calls a generator from the scheduler.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{CombineMode, Condition, ScriptDialect};
use crate::error::Result;

/// Input handed to a [`ScriptGenerator`].
#[derive(Debug, Clone)]
pub struct GenerationRequest<'a> {
    pub stock_code: &'a str,
    pub stock_name: &'a str,
    pub intent: &'a str,
    pub dialect: ScriptDialect,
    /// Conditions the rule table recognised in the intent.
    pub conditions: &'a [Condition],
    pub combine: CombineMode,
}

/// Raw output of a generator, validated before use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedScript {
    #[serde(alias = "script")]
    pub script_text: String,
    pub conditions: Vec<Condition>,
}

/// Produces script text and conditions for a recognised intent.
#[async_trait]
pub trait ScriptGenerator: Send + Sync {
    fn name(&self) -> &'static str;

    /// # Errors
    ///
    /// Returns an error when the backend fails or its output cannot be
    /// decoded.
    async fn generate(&self, request: &GenerationRequest<'_>) -> Result<GeneratedScript>;
}
