//! Content envelope - the normalized representation of one input item.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Where a signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Email,
    Note,
    Calendar,
    #[default]
    Unknown,
}

impl SourceKind {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Email => "email",
            SourceKind::Note => "note",
            SourceKind::Calendar => "calendar",
            SourceKind::Unknown => "unknown",
        }
    }
}

/// A raw source-specific payload, tagged by origin.
///
/// This is the pipeline's input type. The surrounding collaborators (inbox
/// poller, note watcher, calendar sync) construct these; the normalizer maps
/// each one into a [`ContentEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum SourceItem {
    Email {
        subject: String,
        body: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        received_at: Option<DateTime<Utc>>,
    },
    Note {
        path: String,
        text: String,
    },
    Calendar {
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        location: Option<String>,
        #[serde(default)]
        attendees: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        calendar_id: Option<String>,
        start: DateTime<Utc>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        end: Option<DateTime<Utc>>,
    },
    /// Anything the collaborators could not type. The normalizer falls back
    /// to a JSON dump so the classifier still gets a usable envelope.
    Other(serde_json::Value),
}

impl SourceItem {
    /// The source kind this payload maps to.
    pub fn kind(&self) -> SourceKind {
        match self {
            SourceItem::Email { .. } => SourceKind::Email,
            SourceItem::Note { .. } => SourceKind::Note,
            SourceItem::Calendar { .. } => SourceKind::Calendar,
            SourceItem::Other(_) => SourceKind::Unknown,
        }
    }
}

/// Normalized `{source, text, metadata, date}` representation of one input
/// item. Immutable, scoped to a single pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentEnvelope {
    pub source: SourceKind,
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
    pub date: DateTime<Utc>,
}

impl ContentEnvelope {
    /// Fetch a metadata value as a string, if present.
    pub fn metadata_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(|v| v.as_str())
    }
}
