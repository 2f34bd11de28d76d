//! Parsing of classifier responses.
//!
//! Model output is free text that usually, but not always, contains the
//! JSON we asked for. All of the best-effort string surgery lives here so
//! the brittleness is contained: strip code fences, parse, and if that
//! fails slice from the first `{` to the last `}` and parse again. Total
//! failure is never an error - it degrades to zero candidates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::types::{
    CandidateEntity, ContentEnvelope, EventCandidate, EventCategory, NarrativeCandidate,
    NarrativeSource, TaskCandidate, Urgency,
};

static CODE_FENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"```(?:[a-zA-Z0-9]*)?\s*([\s\S]*?)\s*```").unwrap());

const DETECTED_FROM_CHARS: usize = 120;

/// Remove markdown code fences from a response, keeping the inner content.
pub fn strip_code_fences(content: &str) -> String {
    let content = content.trim();
    match CODE_FENCE_RE.captures(content) {
        Some(captures) => captures
            .get(1)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_else(|| content.to_string()),
        None => content.to_string(),
    }
}

/// Slice out the outermost JSON object, if the text contains one.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[derive(Debug, Default, Deserialize)]
struct RawClassification {
    #[serde(default)]
    tasks: Vec<RawTask>,
    #[serde(default)]
    events: Vec<RawEvent>,
    #[serde(default)]
    narrative: Option<RawNarrative>,
}

#[derive(Debug, Deserialize)]
struct RawTask {
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    urgency: Option<String>,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawEvent {
    #[serde(default)]
    title: String,
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    attendees: Vec<String>,
    #[serde(default)]
    category: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawNarrative {
    #[serde(default)]
    headline: String,
    #[serde(default)]
    bullets: Vec<String>,
}

fn parse_raw(response: &str) -> Option<RawClassification> {
    let cleaned = strip_code_fences(response);
    if cleaned.is_empty() {
        return None;
    }

    if let Ok(raw) = serde_json::from_str::<RawClassification>(&cleaned) {
        return Some(raw);
    }

    // Model wrapped or prefixed the object with prose; re-try on the
    // outermost brace pair.
    let sliced = extract_json_object(&cleaned)?;
    serde_json::from_str::<RawClassification>(sliced).ok()
}

/// Parse a classifier response into candidate entities.
///
/// The envelope supplies fallbacks the response may omit: dates, the
/// narrative source, and provenance metadata.
pub fn parse_candidates(response: &str, envelope: &ContentEnvelope) -> Vec<CandidateEntity> {
    let raw = match parse_raw(response) {
        Some(raw) => raw,
        None => {
            tracing::warn!(
                source = envelope.source.as_str(),
                "unparseable classifier response, producing no candidates"
            );
            return Vec::new();
        }
    };

    let detected_from: String = envelope.text.chars().take(DETECTED_FROM_CHARS).collect();
    let mut candidates = Vec::new();

    for task in raw.tasks {
        if task.title.trim().is_empty() && task.description.trim().is_empty() {
            continue;
        }
        candidates.push(CandidateEntity::Task(TaskCandidate {
            title: task.title.trim().to_string(),
            description: task.description.trim().to_string(),
            urgency: task
                .urgency
                .as_deref()
                .map(|s| Urgency::from_str_or_default(s.trim().to_lowercase().as_str()))
                .unwrap_or_default(),
            due_date: task.due_date.as_deref().and_then(parse_date),
            confidence: task.confidence.unwrap_or(0.8).clamp(0.0, 1.0),
            source: envelope.source,
            detected_from: detected_from.clone(),
        }));
    }

    for event in raw.events {
        if event.title.trim().is_empty() {
            continue;
        }
        candidates.push(CandidateEntity::Event(EventCandidate {
            title: event.title.trim().to_string(),
            start_time: event
                .start_time
                .as_deref()
                .and_then(parse_datetime)
                .unwrap_or(envelope.date),
            end_time: event.end_time.as_deref().and_then(parse_datetime),
            location: event.location.filter(|l| !l.trim().is_empty()),
            attendees: event.attendees,
            category: event
                .category
                .as_deref()
                .map(|s| EventCategory::from_str_or_default(s.trim().to_lowercase().as_str()))
                .unwrap_or_default(),
        }));
    }

    if let Some(narrative) = raw.narrative {
        if !narrative.headline.trim().is_empty() {
            candidates.push(CandidateEntity::Narrative(NarrativeCandidate {
                headline: narrative.headline.trim().to_string(),
                bullets: narrative.bullets,
                date: envelope.date,
                source: NarrativeSource::from_source_kind(envelope.source),
                source_file: envelope.metadata_str("filepath").map(|s| s.to_string()),
                source_id: envelope
                    .metadata_str("message_id")
                    .or_else(|| envelope.metadata_str("calendar_id"))
                    .map(|s| s.to_string()),
            }));
        }
    }

    candidates
}

/// Lenient timestamp parsing: RFC 3339, then naive datetime, then
/// date-only at midnight.
fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("null") {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    parse_date(s).and_then(|d| d.and_hms_opt(0, 0, 0)).map(|n| n.and_utc())
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("null") {
        return None;
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SourceKind;
    use chrono::TimeZone;
    use std::collections::HashMap;

    fn envelope() -> ContentEnvelope {
        let mut metadata = HashMap::new();
        metadata.insert(
            "filepath".to_string(),
            serde_json::json!("/Clients/AcmeCo/notes.md"),
        );
        ContentEnvelope {
            source: SourceKind::Note,
            text: "Please send the Q3 deck by Friday".to_string(),
            metadata,
            date: Utc.with_ymd_and_hms(2026, 3, 10, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_parse_plain_json() {
        let response = r#"{"tasks": [{"title": "Send Q3 deck", "urgency": "soon", "confidence": 0.85}]}"#;
        let candidates = parse_candidates(response, &envelope());
        assert_eq!(candidates.len(), 1);
        match &candidates[0] {
            CandidateEntity::Task(t) => {
                assert_eq!(t.title, "Send Q3 deck");
                assert_eq!(t.urgency, Urgency::Soon);
                assert_eq!(t.confidence, 0.85);
                assert_eq!(t.source, SourceKind::Note);
            }
            other => panic!("expected task, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_fenced_json() {
        let response = "```json\n{\"tasks\": [{\"title\": \"Send Q3 deck\"}]}\n```";
        let candidates = parse_candidates(response, &envelope());
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_parse_json_with_prose_prefix() {
        let response = "Here is what I found:\n{\"tasks\": [{\"title\": \"Send Q3 deck\"}]}";
        let candidates = parse_candidates(response, &envelope());
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_garbled_fenced_response_yields_nothing() {
        let response = "```json\n{not valid\n```";
        let candidates = parse_candidates(response, &envelope());
        assert!(candidates.is_empty());
    }

    #[test]
    fn test_empty_response_yields_nothing() {
        assert!(parse_candidates("", &envelope()).is_empty());
        assert!(parse_candidates("no json here", &envelope()).is_empty());
    }

    #[test]
    fn test_default_confidence_applied() {
        let response = r#"{"tasks": [{"title": "Send Q3 deck"}]}"#;
        let candidates = parse_candidates(response, &envelope());
        match &candidates[0] {
            CandidateEntity::Task(t) => assert_eq!(t.confidence, 0.8),
            other => panic!("expected task, got {:?}", other),
        }
    }

    #[test]
    fn test_event_start_falls_back_to_envelope_date() {
        let response = r#"{"events": [{"title": "Sprint review", "start_time": "not a time"}]}"#;
        let candidates = parse_candidates(response, &envelope());
        match &candidates[0] {
            CandidateEntity::Event(e) => assert_eq!(e.start_time, envelope().date),
            other => panic!("expected event, got {:?}", other),
        }
    }

    #[test]
    fn test_event_lenient_datetime_formats() {
        assert!(parse_datetime("2026-03-12T09:30:00Z").is_some());
        assert!(parse_datetime("2026-03-12T09:30:00").is_some());
        assert!(parse_datetime("2026-03-12").is_some());
        assert!(parse_datetime("null").is_none());
    }

    #[test]
    fn test_narrative_carries_provenance() {
        let response = r#"{"narrative": {"headline": "Deck work kicked off", "bullets": ["Q3 deck requested"]}}"#;
        let candidates = parse_candidates(response, &envelope());
        match &candidates[0] {
            CandidateEntity::Narrative(n) => {
                assert_eq!(n.headline, "Deck work kicked off");
                assert_eq!(n.source, NarrativeSource::Note);
                assert_eq!(n.source_file.as_deref(), Some("/Clients/AcmeCo/notes.md"));
            }
            other => panic!("expected narrative, got {:?}", other),
        }
    }

    #[test]
    fn test_null_narrative_is_skipped() {
        let response = r#"{"tasks": [], "narrative": null}"#;
        assert!(parse_candidates(response, &envelope()).is_empty());
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(
            strip_code_fences("```json\n{\"key\": 1}\n```"),
            "{\"key\": 1}"
        );
        assert_eq!(strip_code_fences("{\"key\": 1}"), "{\"key\": 1}");
    }
}
