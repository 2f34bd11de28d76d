//! The ingestion pipeline stages.
//!
//! Stages run in a fixed order: [`normalize`] flattens a source item into
//! a [`crate::types::ContentEnvelope`], [`resolver`] attributes it to a
//! project, the classifier proposes candidates, [`dedup`] and [`score`]
//! filter, and [`materialize`] persists. [`processor`] wires it all up.

pub mod dedup;
pub mod materialize;
pub mod normalize;
pub mod parser;
pub mod processor;
pub mod prompts;
pub mod resolver;
pub mod score;

pub use dedup::{edit_distance, similarity, DuplicateDetector, SynonymTable};
pub use materialize::EntityMaterializer;
pub use normalize::normalize;
pub use parser::parse_candidates;
pub use processor::Processor;
pub use resolver::ProjectResolver;
pub use score::{passes_filter, significance, SIGNIFICANCE_FLOOR};
