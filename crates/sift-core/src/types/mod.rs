//! Core types for the sift pipeline.

mod entity;
mod envelope;
mod message;
mod project;

pub use entity::{
    BatchOutcome, CandidateEntity, DuplicateVerdict, EntityKind, EventCandidate, EventCategory,
    EventRecord,
    NarrativeCandidate, NarrativeRecord, NarrativeSource, PersistedEntity, ProcessOutcome,
    StoredEntity, TaskCandidate, TaskRecord, Urgency,
};
pub use envelope::{ContentEnvelope, SourceItem, SourceKind};
pub use message::{format_messages, Message, MessageRole};
pub use project::{Project, ProjectStatus};
