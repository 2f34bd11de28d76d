//! Candidate and persisted entity types.
//!
//! A [`CandidateEntity`] is a classifier-proposed task/event/narrative
//! fragment that has not been persisted yet. Candidates flow through the
//! duplicate detector and significance scorer and either get dropped or
//! become a [`PersistedEntity`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::envelope::SourceKind;

/// How soon a task needs attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Now,
    #[default]
    Soon,
    Eventually,
}

impl Urgency {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Now => "now",
            Urgency::Soon => "soon",
            Urgency::Eventually => "eventually",
        }
    }

    /// Parse from a stored string, defaulting to soon.
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "now" => Urgency::Now,
            "eventually" => Urgency::Eventually,
            _ => Urgency::Soon,
        }
    }
}

/// Work/life split for calendar events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    #[default]
    Work,
    Life,
}

impl EventCategory {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Work => "work",
            EventCategory::Life => "life",
        }
    }

    /// Parse from a stored string, defaulting to work.
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "life" => EventCategory::Life,
            _ => EventCategory::Work,
        }
    }
}

/// Origin of a narrative entry, used by the significance scorer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NarrativeSource {
    Meeting,
    Email,
    #[default]
    Note,
    Event,
}

impl NarrativeSource {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            NarrativeSource::Meeting => "meeting",
            NarrativeSource::Email => "email",
            NarrativeSource::Note => "note",
            NarrativeSource::Event => "event",
        }
    }

    /// Parse from a stored string, defaulting to note.
    pub fn from_str_or_default(s: &str) -> Self {
        match s {
            "meeting" => NarrativeSource::Meeting,
            "email" => NarrativeSource::Email,
            "event" => NarrativeSource::Event,
            _ => NarrativeSource::Note,
        }
    }

    /// Derive the narrative source from the envelope's source kind.
    pub fn from_source_kind(kind: SourceKind) -> Self {
        match kind {
            SourceKind::Email => NarrativeSource::Email,
            SourceKind::Calendar => NarrativeSource::Meeting,
            SourceKind::Note | SourceKind::Unknown => NarrativeSource::Note,
        }
    }
}

/// The closed set of entity kinds the pipeline produces.
///
/// Store dispatch is an explicit `match` over this enum so the compiler
/// enforces exhaustiveness when a new kind is added.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Task,
    Event,
    Narrative,
}

impl EntityKind {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Task => "task",
            EntityKind::Event => "event",
            EntityKind::Narrative => "narrative",
        }
    }
}

/// A classifier-proposed task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskCandidate {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    /// Classifier confidence in [0, 1]; doubles as the significance score.
    pub confidence: f64,
    pub source: SourceKind,
    /// Short excerpt of the input this task was detected from.
    pub detected_from: String,
}

/// A classifier-proposed calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventCandidate {
    pub title: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    #[serde(default)]
    pub category: EventCategory,
}

/// A classifier-proposed narrative log fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeCandidate {
    pub headline: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    pub date: DateTime<Utc>,
    pub source: NarrativeSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
}

/// Tagged union of classifier-proposed entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CandidateEntity {
    Task(TaskCandidate),
    Event(EventCandidate),
    Narrative(NarrativeCandidate),
}

impl CandidateEntity {
    /// The entity kind of this candidate.
    pub fn kind(&self) -> EntityKind {
        match self {
            CandidateEntity::Task(_) => EntityKind::Task,
            CandidateEntity::Event(_) => EntityKind::Event,
            CandidateEntity::Narrative(_) => EntityKind::Narrative,
        }
    }

    /// Display text used for duplicate matching: the first non-empty of
    /// title/headline, falling back to the description.
    pub fn display_text(&self) -> &str {
        match self {
            CandidateEntity::Task(t) => {
                if t.title.is_empty() {
                    &t.description
                } else {
                    &t.title
                }
            }
            CandidateEntity::Event(e) => &e.title,
            CandidateEntity::Narrative(n) => &n.headline,
        }
    }
}

/// A persisted task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    pub description: String,
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub source: SourceKind,
    pub detected_from: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// A persisted calendar event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub id: String,
    pub title: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub attendees: Vec<String>,
    pub category: EventCategory,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A persisted narrative log entry. Narrative records are the only kind
/// that retains its significance score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NarrativeRecord {
    pub id: String,
    pub headline: String,
    #[serde(default)]
    pub bullets: Vec<String>,
    pub date: DateTime<Utc>,
    pub source: NarrativeSource,
    pub significance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Tagged union of persisted records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PersistedEntity {
    Task(TaskRecord),
    Event(EventRecord),
    Narrative(NarrativeRecord),
}

impl PersistedEntity {
    /// The lightweight view of this record used for duplicate matching.
    pub fn as_stored(&self) -> StoredEntity {
        match self {
            PersistedEntity::Task(t) => StoredEntity {
                id: t.id.clone(),
                kind: EntityKind::Task,
                text: t.title.clone(),
                project_id: t.project_id.clone(),
                completed: t.completed,
                created_at: t.created_at,
            },
            PersistedEntity::Event(e) => StoredEntity {
                id: e.id.clone(),
                kind: EntityKind::Event,
                text: e.title.clone(),
                project_id: e.project_id.clone(),
                completed: false,
                created_at: e.created_at,
            },
            PersistedEntity::Narrative(n) => StoredEntity {
                id: n.id.clone(),
                kind: EntityKind::Narrative,
                text: n.headline.clone(),
                project_id: n.project_id.clone(),
                completed: false,
                created_at: n.created_at,
            },
        }
    }
}

/// A lightweight view of an existing record, as returned by
/// `EntityStore::recent` for duplicate matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntity {
    pub id: String,
    pub kind: EntityKind,
    /// Display text of the stored record (title/headline).
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

/// Verdict of a duplicate check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DuplicateVerdict {
    pub is_duplicate: bool,
    /// The existing record that matched, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched: Option<StoredEntity>,
    /// Similarity of the match in [0, 1].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f64>,
}

impl DuplicateVerdict {
    /// A verdict with no match.
    pub fn not_duplicate() -> Self {
        Self::default()
    }
}

/// Result of processing a single input item.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessOutcome {
    pub tasks: Vec<TaskRecord>,
    pub events: Vec<EventRecord>,
    pub narratives: Vec<NarrativeRecord>,
    /// Candidates suppressed as near-duplicates.
    pub duplicates_skipped: usize,
    /// Non-task candidates dropped by the significance filter.
    pub low_significance_dropped: usize,
}

impl ProcessOutcome {
    /// Total number of persisted entities.
    pub fn created(&self) -> usize {
        self.tasks.len() + self.events.len() + self.narratives.len()
    }

    /// Fold another outcome into this one.
    pub fn merge(&mut self, other: ProcessOutcome) {
        self.tasks.extend(other.tasks);
        self.events.extend(other.events);
        self.narratives.extend(other.narratives);
        self.duplicates_skipped += other.duplicates_skipped;
        self.low_significance_dropped += other.low_significance_dropped;
    }
}

/// Aggregate result for a batch run. Items are processed strictly
/// sequentially; a failed classification call marks the item failed but
/// never aborts the batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub outcome: ProcessOutcome,
    pub items_processed: usize,
    pub items_failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_text_prefers_title() {
        let task = CandidateEntity::Task(TaskCandidate {
            title: "Send deck".to_string(),
            description: "Send the Q3 deck".to_string(),
            urgency: Urgency::Soon,
            due_date: None,
            confidence: 0.8,
            source: SourceKind::Email,
            detected_from: String::new(),
        });
        assert_eq!(task.display_text(), "Send deck");
    }

    #[test]
    fn test_display_text_falls_back_to_description() {
        let task = CandidateEntity::Task(TaskCandidate {
            title: String::new(),
            description: "Send the Q3 deck".to_string(),
            urgency: Urgency::Soon,
            due_date: None,
            confidence: 0.8,
            source: SourceKind::Email,
            detected_from: String::new(),
        });
        assert_eq!(task.display_text(), "Send the Q3 deck");
    }

    #[test]
    fn test_narrative_source_from_kind() {
        assert_eq!(
            NarrativeSource::from_source_kind(SourceKind::Calendar),
            NarrativeSource::Meeting
        );
        assert_eq!(
            NarrativeSource::from_source_kind(SourceKind::Email),
            NarrativeSource::Email
        );
        assert_eq!(
            NarrativeSource::from_source_kind(SourceKind::Unknown),
            NarrativeSource::Note
        );
    }

    #[test]
    fn test_outcome_merge() {
        let mut a = ProcessOutcome {
            duplicates_skipped: 1,
            ..Default::default()
        };
        let b = ProcessOutcome {
            duplicates_skipped: 2,
            low_significance_dropped: 1,
            ..Default::default()
        };
        a.merge(b);
        assert_eq!(a.duplicates_skipped, 3);
        assert_eq!(a.low_significance_dropped, 1);
    }
}
