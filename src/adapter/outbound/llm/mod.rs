//! LLM adapter modules.
//!
//! [`OpenAi`] implements the [`Llm`](crate::port::outbound::llm::Llm) port;
//! [`LlmScriptGenerator`] turns any `Llm` into a script generator.

pub mod generator;
pub mod openai;

pub use generator::LlmScriptGenerator;
pub use openai::OpenAi;
