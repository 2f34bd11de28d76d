//! Content normalizer - maps source-specific payloads into envelopes.
//!
//! Normalization has no failure mode: every payload, including ones the
//! collaborators could not type, produces a usable envelope.

use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

use crate::types::{ContentEnvelope, SourceItem, SourceKind};

static PATH_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{4}-\d{2}-\d{2})").unwrap());

/// Normalize a raw payload into a content envelope.
pub fn normalize(item: &SourceItem) -> ContentEnvelope {
    normalize_at(item, Utc::now())
}

/// Normalize with an explicit clock. Split out so tests control "now".
pub fn normalize_at(item: &SourceItem, now: DateTime<Utc>) -> ContentEnvelope {
    match item {
        SourceItem::Email {
            subject,
            body,
            sender,
            message_id,
            received_at,
        } => {
            let text = if body.trim().is_empty() {
                subject.clone()
            } else {
                format!("{}\n\n{}", subject, body)
            };
            let mut metadata = HashMap::new();
            if let Some(sender) = sender {
                metadata.insert("sender".to_string(), serde_json::json!(sender));
            }
            if let Some(id) = message_id {
                metadata.insert("message_id".to_string(), serde_json::json!(id));
            }
            ContentEnvelope {
                source: SourceKind::Email,
                text,
                metadata,
                date: received_at.unwrap_or(now),
            }
        }
        SourceItem::Note { path, text } => {
            let mut metadata = HashMap::new();
            metadata.insert("filepath".to_string(), serde_json::json!(path));
            ContentEnvelope {
                source: SourceKind::Note,
                text: text.clone(),
                metadata,
                date: date_from_path(path).unwrap_or(now),
            }
        }
        SourceItem::Calendar {
            summary,
            description,
            location,
            attendees,
            calendar_id,
            start,
            end,
        } => {
            let text = match description.as_deref().filter(|d| !d.trim().is_empty()) {
                Some(desc) => format!("{}\n\n{}", summary, desc),
                None => summary.clone(),
            };
            let mut metadata = HashMap::new();
            if let Some(location) = location {
                metadata.insert("location".to_string(), serde_json::json!(location));
            }
            if !attendees.is_empty() {
                metadata.insert("attendees".to_string(), serde_json::json!(attendees));
            }
            if let Some(id) = calendar_id {
                metadata.insert("calendar_id".to_string(), serde_json::json!(id));
            }
            if let Some(end) = end {
                metadata.insert("end_time".to_string(), serde_json::json!(end));
            }
            ContentEnvelope {
                source: SourceKind::Calendar,
                text,
                metadata,
                date: *start,
            }
        }
        SourceItem::Other(value) => ContentEnvelope {
            source: SourceKind::Unknown,
            text: value.to_string(),
            metadata: HashMap::new(),
            date: now,
        },
    }
}

/// Pull an embedded `YYYY-MM-DD` out of a file path, as midnight UTC.
fn date_from_path(path: &str) -> Option<DateTime<Utc>> {
    let m = PATH_DATE_RE.captures(path)?;
    let date = NaiveDate::parse_from_str(m.get(1)?.as_str(), "%Y-%m-%d").ok()?;
    Some(date.and_hms_opt(0, 0, 0)?.and_utc())
}
