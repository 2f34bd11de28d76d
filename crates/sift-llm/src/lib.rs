//! sift-llm - Classifier provider implementations for sift.
//!
//! The pipeline only needs one capability from a model: strict
//! request/response text generation, preferably in JSON mode. This crate
//! provides that behind [`sift_core::traits::Llm`] for three providers.
//!
//! # Supported Providers
//!
//! - **OpenAI** - gpt-4o-mini and friends, with native JSON mode
//! - **Anthropic** - Claude models, JSON enforced via the system prompt
//! - **Ollama** - local models, no API key required
//!
//! # Example
//!
//! ```ignore
//! use sift_llm::LlmFactory;
//!
//! let llm = LlmFactory::openai_with_model("gpt-4o-mini")?;
//! ```

mod anthropic;
mod factory;
mod ollama;
mod openai;

pub use anthropic::AnthropicLlm;
pub use factory::LlmFactory;
pub use ollama::OllamaLlm;
pub use openai::OpenAiLlm;

// Re-export core types for convenience
pub use sift_core::config::LlmProvider;
pub use sift_core::traits::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
