//! Project resolution through an ordered, short-circuiting fallback chain.
//!
//! Strategy order is fixed: path markers, then name keywords, then fuzzy
//! token overlap, then a classifier call, then the generic catch-alls.
//! The first hit wins. Every strategy is fault-isolated; a failure is
//! logged and treated as "no match", never propagated.

use serde::Deserialize;
use std::sync::Arc;

use crate::cache::ProjectCache;
use crate::config::ResolverConfig;
use crate::pipeline::parser::{extract_json_object, strip_code_fences};
use crate::pipeline::prompts::project_resolution_prompt;
use crate::traits::{GenerationOptions, Llm, ResponseFormat};
use crate::types::{ContentEnvelope, Message, Project};

/// Resolves an envelope to its best-guess project.
pub struct ProjectResolver {
    cache: Arc<ProjectCache>,
    llm: Arc<dyn Llm>,
    config: ResolverConfig,
}

impl ProjectResolver {
    /// Create a resolver over a project snapshot cache.
    pub fn new(cache: Arc<ProjectCache>, llm: Arc<dyn Llm>, config: ResolverConfig) -> Self {
        Self { cache, llm, config }
    }

    /// Resolve the envelope to a project, or `None` for an orphan.
    pub async fn resolve(&self, envelope: &ContentEnvelope) -> Option<Project> {
        // The snapshot read refreshes first if the TTL has lapsed.
        let projects = self.cache.get().await;
        if projects.is_empty() {
            tracing::debug!("no active projects, envelope stays orphaned");
            return None;
        }

        if let Some(project) = self.by_path(envelope, &projects) {
            tracing::debug!(project = %project.name, "resolved by path");
            return Some(project);
        }

        if let Some(project) = by_keyword(&envelope.text, &projects) {
            tracing::debug!(project = %project.name, "resolved by keyword");
            return Some(project);
        }

        if let Some(project) = self.by_fuzzy_text(&envelope.text, &projects) {
            tracing::debug!(project = %project.name, "resolved by fuzzy overlap");
            return Some(project);
        }

        match self.by_classifier(envelope, &projects).await {
            Ok(Some(project)) => {
                tracing::debug!(project = %project.name, "resolved by classifier");
                return Some(project);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!("classifier-assisted resolution failed: {}", e);
            }
        }

        let fallback = self.generic_fallback(&projects);
        if let Some(ref project) = fallback {
            tracing::debug!(project = %project.name, "resolved by generic fallback");
        }
        fallback
    }

    /// Strategy 1: conventional folder markers in the file path.
    fn by_path(&self, envelope: &ContentEnvelope, projects: &[Project]) -> Option<Project> {
        let path = envelope.metadata_str("filepath")?;
        let segments: Vec<&str> = path.split(['/', '\\']).filter(|s| !s.is_empty()).collect();

        for (i, segment) in segments.iter().enumerate() {
            let next = match segments.get(i + 1) {
                Some(next) => next,
                None => continue,
            };

            if self
                .config
                .client_markers
                .iter()
                .any(|m| segment.eq_ignore_ascii_case(m))
            {
                let needle = next.to_lowercase();
                if let Some(project) = projects.iter().find(|p| {
                    let name = p.name.to_lowercase();
                    needle.contains(&name) || name.contains(&needle)
                }) {
                    return Some(project.clone());
                }
            }

            if segment.eq_ignore_ascii_case(&self.config.code_marker) {
                // Secondary fuzzy match for the code-projects folder.
                let folder_tokens = tokenize(next);
                let best = projects
                    .iter()
                    .map(|p| (p, token_overlap(&p.name, &folder_tokens)))
                    .filter(|(_, score)| *score > self.config.fuzzy_threshold)
                    .max_by(|(_, a), (_, b)| a.total_cmp(b));
                if let Some((project, _)) = best {
                    return Some(project.clone());
                }
                // Named generic project for code content with no token match.
                if let Some(project) = projects
                    .iter()
                    .find(|p| p.name.eq_ignore_ascii_case(&self.config.code_fallback_project))
                {
                    return Some(project.clone());
                }
            }
        }
        None
    }

    /// Strategy 3: fuzzy token overlap, only worth trying on longer text.
    fn by_fuzzy_text(&self, text: &str, projects: &[Project]) -> Option<Project> {
        if text.chars().count() < self.config.fuzzy_min_text_len {
            return None;
        }
        let text_tokens = tokenize(text);
        let best = projects
            .iter()
            .map(|p| (p, token_overlap(&p.name, &text_tokens)))
            .max_by(|(_, a), (_, b)| a.total_cmp(b))?;

        (best.1 > self.config.fuzzy_threshold).then(|| best.0.clone())
    }

    /// Strategy 4: ask the classifier with a short excerpt.
    async fn by_classifier(
        &self,
        envelope: &ContentEnvelope,
        projects: &[Project],
    ) -> crate::error::SiftResult<Option<Project>> {
        let excerpt: String = envelope.text.chars().take(self.config.excerpt_chars).collect();
        let names: Vec<String> = projects.iter().map(|p| p.name.clone()).collect();
        let prompt = project_resolution_prompt(&names, &excerpt);

        let options = GenerationOptions {
            temperature: Some(0.0),
            response_format: Some(ResponseFormat::Json),
            ..Default::default()
        };
        let response = self
            .llm
            .generate(&[Message::user(prompt)], Some(options))
            .await?;

        #[derive(Debug, Deserialize)]
        struct Suggestion {
            #[serde(default)]
            project: Option<String>,
        }

        let cleaned = strip_code_fences(response.content_or_empty());
        let json = extract_json_object(&cleaned).unwrap_or(&cleaned);
        let suggestion: Suggestion = match serde_json::from_str(json) {
            Ok(s) => s,
            Err(_) => return Ok(None),
        };

        let name = match suggestion.project {
            Some(name) if !name.trim().is_empty() && !name.eq_ignore_ascii_case("null") => name,
            _ => return Ok(None),
        };

        let needle = name.trim().to_lowercase();
        Ok(projects
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
            .or_else(|| {
                projects.iter().find(|p| {
                    let pn = p.name.to_lowercase();
                    pn.contains(&needle) || needle.contains(&pn)
                })
            })
            .cloned())
    }

    /// Strategy 5: a small fixed list of catch-all project names.
    fn generic_fallback(&self, projects: &[Project]) -> Option<Project> {
        self.config.generic_fallbacks.iter().find_map(|name| {
            projects
                .iter()
                .find(|p| p.name.eq_ignore_ascii_case(name))
                .cloned()
        })
    }
}

/// Strategy 2: case-insensitive project-name substring in the text.
fn by_keyword(text: &str, projects: &[Project]) -> Option<Project> {
    let text = text.to_lowercase();
    projects
        .iter()
        .find(|p| !p.name.is_empty() && text.contains(&p.name.to_lowercase()))
        .cloned()
}

/// Lower-cased alphanumeric words longer than 3 chars.
fn tokenize(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 3)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Fraction of the project's name tokens found among the text tokens,
/// via substring containment in either direction.
fn token_overlap(project_name: &str, text_tokens: &[String]) -> f64 {
    let name_tokens = tokenize(project_name);
    if name_tokens.is_empty() {
        return 0.0;
    }
    let found = name_tokens
        .iter()
        .filter(|nt| {
            text_tokens
                .iter()
                .any(|tt| tt.contains(nt.as_str()) || nt.contains(tt.as_str()))
        })
        .count();
    found as f64 / name_tokens.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SiftResult;
    use crate::traits::{LlmResponse, ProjectStore};
    use crate::types::SourceKind;
    use async_trait::async_trait;
    use chrono::Utc;
    use std::collections::HashMap;

    struct FixedProjects(Vec<Project>);

    #[async_trait]
    impl ProjectStore for FixedProjects {
        async fn active_projects(&self) -> SiftResult<Vec<Project>> {
            Ok(self.0.clone())
        }
    }

    struct ScriptedLlm(Option<String>);

    #[async_trait]
    impl Llm for ScriptedLlm {
        async fn generate(
            &self,
            _messages: &[Message],
            _options: Option<GenerationOptions>,
        ) -> SiftResult<LlmResponse> {
            match &self.0 {
                Some(content) => Ok(LlmResponse {
                    content: Some(content.clone()),
                }),
                None => Err(crate::error::SiftError::llm("scripted failure")),
            }
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn resolver(projects: Vec<Project>, llm_response: Option<String>) -> ProjectResolver {
        let cache = Arc::new(ProjectCache::new(Arc::new(FixedProjects(projects))));
        ProjectResolver::new(cache, Arc::new(ScriptedLlm(llm_response)), ResolverConfig::default())
    }

    fn envelope(text: &str, filepath: Option<&str>) -> ContentEnvelope {
        let mut metadata = HashMap::new();
        if let Some(path) = filepath {
            metadata.insert("filepath".to_string(), serde_json::json!(path));
        }
        ContentEnvelope {
            source: SourceKind::Note,
            text: text.to_string(),
            metadata,
            date: Utc::now(),
        }
    }

    fn acme_and_orbit() -> Vec<Project> {
        vec![
            Project::new("p1", "AcmeCo"),
            Project::new("p2", "Orbit"),
            Project::new("p3", "Personal"),
        ]
    }

    #[tokio::test]
    async fn test_path_strategy_beats_keyword() {
        // The text names Orbit, but the clients folder says AcmeCo; path
        // resolution runs first and short-circuits.
        let r = resolver(acme_and_orbit(), None);
        let env = envelope(
            "Discussed Orbit launch plans",
            Some("/Clients/AcmeCo/notes.md"),
        );
        let project = r.resolve(&env).await.unwrap();
        assert_eq!(project.name, "AcmeCo");
    }

    #[tokio::test]
    async fn test_keyword_strategy() {
        let r = resolver(acme_and_orbit(), None);
        let env = envelope("Need to update the orbit roadmap", None);
        let project = r.resolve(&env).await.unwrap();
        assert_eq!(project.name, "Orbit");
    }

    #[tokio::test]
    async fn test_code_folder_token_match() {
        let projects = vec![
            Project::new("p1", "Billing Service"),
            Project::new("p2", "Code"),
        ];
        let r = resolver(projects, None);
        let env = envelope("refactor", Some("/home/me/code/billing-service/README.md"));
        let project = r.resolve(&env).await.unwrap();
        assert_eq!(project.name, "Billing Service");
    }

    #[tokio::test]
    async fn test_code_folder_generic_fallback() {
        let projects = vec![Project::new("p1", "AcmeCo"), Project::new("p2", "Code")];
        let r = resolver(projects, None);
        let env = envelope("fix the flaky test", Some("/home/me/code/scratchpad/x.rs"));
        let project = r.resolve(&env).await.unwrap();
        assert_eq!(project.name, "Code");
    }

    #[tokio::test]
    async fn test_fuzzy_needs_long_text() {
        let projects = vec![Project::new("p1", "Website Redesign")];
        let r = resolver(projects.clone(), Some(r#"{"project": null}"#.to_string()));

        // Short text: fuzzy is skipped and nothing else matches.
        let env = envelope("redesign mockups", None);
        assert!(r.resolve(&env).await.is_none());

        // Long enough text with both name tokens present, but not the
        // contiguous name, so the keyword strategy cannot claim it.
        let r = resolver(projects, Some(r#"{"project": null}"#.to_string()));
        let env = envelope(
            "The redesign of our website mockups is ready for a second review",
            None,
        );
        let project = r.resolve(&env).await.unwrap();
        assert_eq!(project.name, "Website Redesign");
    }

    #[tokio::test]
    async fn test_classifier_strategy() {
        let projects = vec![Project::new("p1", "Driftwood"), Project::new("p2", "Admin")];
        let r = resolver(
            projects,
            Some("```json\n{\"project\": \"Driftwood\"}\n```".to_string()),
        );
        let env = envelope("ship the beta to the pilot group", None);
        let project = r.resolve(&env).await.unwrap();
        assert_eq!(project.name, "Driftwood");
    }

    #[tokio::test]
    async fn test_classifier_failure_falls_through_to_generic() {
        let projects = vec![Project::new("p1", "Driftwood"), Project::new("p2", "Admin")];
        let r = resolver(projects, None);
        let env = envelope("renew the registration", None);
        let project = r.resolve(&env).await.unwrap();
        assert_eq!(project.name, "Admin");
    }

    #[tokio::test]
    async fn test_orphan_when_nothing_matches() {
        let projects = vec![Project::new("p1", "Driftwood")];
        let r = resolver(projects, Some(r#"{"project": null}"#.to_string()));
        let env = envelope("buy milk", None);
        assert!(r.resolve(&env).await.is_none());
    }

    #[test]
    fn test_tokenize_drops_short_words() {
        assert_eq!(tokenize("fix the apis now"), vec!["apis".to_string()]);
    }
}
