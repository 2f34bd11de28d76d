//! Significance scoring. Pure functions, no I/O.

use crate::types::{CandidateEntity, NarrativeSource};

/// Minimum score a non-task candidate needs to survive. The boundary is
/// exclusive: exactly 0.5 is retained.
pub const SIGNIFICANCE_FLOOR: f64 = 0.5;

/// Score a candidate in [0, 1].
///
/// Tasks carry their classifier confidence. Events score on project
/// association. Narrative entries score on where they came from.
pub fn significance(candidate: &CandidateEntity, has_project: bool) -> f64 {
    match candidate {
        CandidateEntity::Task(task) => task.confidence,
        CandidateEntity::Event(_) => {
            if has_project {
                0.7
            } else {
                0.5
            }
        }
        CandidateEntity::Narrative(narrative) => match narrative.source {
            NarrativeSource::Meeting => 0.9,
            NarrativeSource::Email => 0.6,
            NarrativeSource::Note => 0.5,
            NarrativeSource::Event => 0.7,
        },
    }
}

/// Whether the candidate survives the significance filter. Tasks always
/// pass regardless of score.
pub fn passes_filter(candidate: &CandidateEntity, score: f64) -> bool {
    matches!(candidate, CandidateEntity::Task(_)) || score >= SIGNIFICANCE_FLOOR
}
