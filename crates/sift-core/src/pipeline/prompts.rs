//! Prompt templates for classification calls.

/// Generate the extraction prompt for one envelope.
///
/// The output schema here is the contract [`super::parser`] parses against;
/// keep the two in sync.
pub fn classification_prompt(project: Option<&str>) -> String {
    let context = match project {
        Some(name) => format!("The content belongs to the project \"{}\".\n\n", name),
        None => String::new(),
    };

    format!(
        r#"You are a personal productivity assistant. Extract actionable items from the content the user provides.

{}Output JSON in this exact format:
{{
  "tasks": [
    {{"title": "short imperative", "description": "details", "urgency": "now|soon|eventually", "due_date": "YYYY-MM-DD or null", "confidence": 0.0}}
  ],
  "events": [
    {{"title": "event name", "start_time": "ISO 8601", "end_time": "ISO 8601 or null", "location": "place or null", "attendees": ["name"], "category": "work|life"}}
  ],
  "narrative": {{"headline": "one line summary", "bullets": ["notable detail"]}}
}}

Rules:
1. Only extract items explicitly present in the content
2. Omit arrays that have no items and set "narrative" to null if nothing noteworthy happened
3. confidence is your certainty the task is real, between 0 and 1
4. Keep titles under 80 characters

Return ONLY valid JSON, no other text."#,
        context
    )
}

/// Generate the prompt for the classifier-assisted project resolution
/// strategy: a short excerpt plus the active project names.
pub fn project_resolution_prompt(project_names: &[String], excerpt: &str) -> String {
    format!(
        r#"Pick the project this content most likely belongs to.

PROJECTS: {}

CONTENT:
{}

Output JSON in this exact format: {{"project": "exact project name or null"}}

Return ONLY valid JSON, no other text."#,
        project_names.join(", "),
        excerpt
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_prompt_includes_project_context() {
        let prompt = classification_prompt(Some("AcmeCo"));
        assert!(prompt.contains("AcmeCo"));
        assert!(prompt.contains("\"tasks\""));
        assert!(prompt.contains("\"narrative\""));
    }

    #[test]
    fn test_classification_prompt_without_project() {
        let prompt = classification_prompt(None);
        assert!(!prompt.contains("belongs to the project"));
    }

    #[test]
    fn test_project_resolution_prompt_lists_projects() {
        let names = vec!["AcmeCo".to_string(), "Personal".to_string()];
        let prompt = project_resolution_prompt(&names, "send the deck");
        assert!(prompt.contains("AcmeCo, Personal"));
        assert!(prompt.contains("send the deck"));
    }
}
