//! Script synthesis configuration.

use serde::Deserialize;

use crate::application::synthesis::CombinePolicy;
use crate::domain::ScriptDialect;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SynthesisSection {
    /// Dialect used when a request names none.
    pub default_dialect: ScriptDialect,
    pub combine_policy: CombinePolicy,
    /// Ask the LLM-backed generator for the script, falling back to the
    /// built-in renderer when its output is unusable.
    pub use_generator: bool,
}
