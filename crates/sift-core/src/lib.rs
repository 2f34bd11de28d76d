//! sift-core - Core library for sift.
//!
//! This crate provides the types, traits, and pipeline stages for the
//! sift personal signal ingestion pipeline: raw emails, notes, and
//! calendar entries go in, deduplicated tasks, events, and narrative
//! log entries come out.
//!
//! # Example
//!
//! ```ignore
//! use sift_core::{PipelineConfig, Processor};
//!
//! let config = PipelineConfig::default();
//! let processor = Processor::new(config, llm, entity_store, project_store);
//!
//! let outcome = processor.process(&item).await;
//! println!("created {} entities", outcome.created());
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use cache::{ProjectCache, VerdictCache};
pub use config::{DedupConfig, LlmProvider, PipelineConfig, ResolverConfig, StoreConfig};
pub use error::{ErrorCode, SiftError, SiftResult};
pub use pipeline::{DuplicateDetector, EntityMaterializer, Processor, ProjectResolver};
pub use traits::{EntityStore, GenerationOptions, Llm, LlmConfig, LlmResponse, ProjectStore, RecentFilter, ResponseFormat};
pub use types::{
    BatchOutcome, CandidateEntity, ContentEnvelope, DuplicateVerdict, EntityKind, EventRecord,
    Message, MessageRole, NarrativeRecord, PersistedEntity, ProcessOutcome, Project,
    ProjectStatus, SourceItem, SourceKind, StoredEntity, TaskRecord,
};
