//! Trait seams for external collaborators.

mod llm;
mod store;

pub use llm::{GenerationOptions, Llm, LlmConfig, LlmResponse, ResponseFormat};
pub use store::{EntityStore, ProjectStore, RecentFilter};
