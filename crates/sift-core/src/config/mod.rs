//! Configuration system for sift.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{SiftError, SiftResult};
use crate::traits::LlmConfig;

/// LLM provider type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    OpenAI,
    Anthropic,
    Ollama,
}

/// Provider configuration with type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmProviderConfig {
    /// Provider type.
    pub provider: LlmProvider,
    /// Provider-specific configuration.
    #[serde(flatten)]
    pub config: LlmConfig,
}

impl Default for LlmProviderConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::OpenAI,
            config: LlmConfig {
                model: "gpt-4o-mini".to_string(),
                ..Default::default()
            },
        }
    }
}

/// Duplicate detector tuning.
///
/// The 7-day window and 100-row cap mirror long-standing defaults; they are
/// configurable rather than per-entity-kind until measured false-positive
/// rates say otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Similarity at or above this is a duplicate.
    pub threshold: f64,
    /// Look-back window for existing records, in days.
    pub window_days: i64,
    /// Hard cap on fetched rows.
    pub fetch_limit: usize,
    /// Whether completed tasks count as duplicate candidates.
    pub include_completed: bool,
    /// Whether same-synonym-group terms boost similarity.
    pub synonym_boost: bool,
    /// Verdict cache TTL in seconds.
    pub cache_ttl_secs: u64,
    /// Verdict cache size cap.
    pub cache_max_entries: usize,
    /// How many oldest entries to evict when over the cap.
    pub cache_evict_batch: usize,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold: 0.80,
            window_days: 7,
            fetch_limit: 100,
            include_completed: false,
            synonym_boost: true,
            cache_ttl_secs: 5 * 60,
            cache_max_entries: 1000,
            cache_evict_batch: 100,
        }
    }
}

impl DedupConfig {
    /// Verdict cache TTL as a duration.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Project resolver tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Folder names that mark the next path segment as a client name.
    pub client_markers: Vec<String>,
    /// Folder name holding code projects.
    pub code_marker: String,
    /// Generic project assigned to code-folder content with no token match.
    pub code_fallback_project: String,
    /// Catch-all project names tried last, in order.
    pub generic_fallbacks: Vec<String>,
    /// Minimum text length before fuzzy token matching is attempted.
    pub fuzzy_min_text_len: usize,
    /// Minimum token-overlap score for a fuzzy match.
    pub fuzzy_threshold: f64,
    /// How much envelope text the classifier-assisted strategy sees.
    pub excerpt_chars: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            client_markers: vec!["clients".to_string()],
            code_marker: "code".to_string(),
            code_fallback_project: "Code".to_string(),
            generic_fallbacks: vec![
                "Personal".to_string(),
                "Admin".to_string(),
                "General".to_string(),
            ],
            fuzzy_min_text_len: 50,
            fuzzy_threshold: 0.5,
            excerpt_chars: 300,
        }
    }
}

/// Persistence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database.
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let sift_dir = dirs::home_dir()
            .map(|h| h.join(".sift"))
            .unwrap_or_else(|| PathBuf::from(".sift"));
        Self {
            db_path: sift_dir.join("sift.db"),
        }
    }
}

/// Main pipeline configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// LLM configuration.
    pub llm: LlmProviderConfig,
    /// Persistence configuration.
    pub store: StoreConfig,
    /// Project resolver configuration.
    pub resolver: ResolverConfig,
    /// Duplicate detector configuration.
    pub dedup: DedupConfig,
    /// Project snapshot TTL in seconds.
    pub project_cache_ttl_secs: u64,
}

impl PipelineConfig {
    /// Project snapshot TTL as a duration.
    pub fn project_cache_ttl(&self) -> Duration {
        if self.project_cache_ttl_secs == 0 {
            crate::cache::DEFAULT_CACHE_TTL
        } else {
            Duration::from_secs(self.project_cache_ttl_secs)
        }
    }

    /// Load configuration from a file (TOML or JSON).
    pub fn from_file(path: impl AsRef<std::path::Path>) -> SiftResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| SiftError::Configuration(e.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| SiftError::Configuration(e.to_string()))
            }
            _ => Err(SiftError::Configuration(
                "Unsupported config file format. Use .toml or .json".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables, on top of defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(provider) = std::env::var("SIFT_LLM_PROVIDER") {
            match provider.to_lowercase().as_str() {
                "anthropic" => config.llm.provider = LlmProvider::Anthropic,
                "ollama" => config.llm.provider = LlmProvider::Ollama,
                _ => config.llm.provider = LlmProvider::OpenAI,
            }
        }
        if let Ok(model) = std::env::var("SIFT_LLM_MODEL") {
            config.llm.config.model = model;
        }
        if let Ok(api_key) = std::env::var("OPENAI_API_KEY") {
            if config.llm.provider == LlmProvider::OpenAI {
                config.llm.config.api_key = Some(api_key);
            }
        }
        if let Ok(api_key) = std::env::var("ANTHROPIC_API_KEY") {
            if config.llm.provider == LlmProvider::Anthropic {
                config.llm.config.api_key = Some(api_key);
            }
        }
        if let Ok(path) = std::env::var("SIFT_DB_PATH") {
            config.store.db_path = PathBuf::from(path);
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PipelineConfig::default();
        assert_eq!(config.dedup.threshold, 0.80);
        assert_eq!(config.dedup.window_days, 7);
        assert_eq!(config.resolver.fuzzy_min_text_len, 50);
        assert_eq!(config.project_cache_ttl(), Duration::from_secs(5 * 60));
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            project_cache_ttl_secs = 60

            [llm]
            provider = "ollama"
            model = "llama3.1"

            [dedup]
            threshold = 0.9
            window_days = 14
        "#;
        let config: PipelineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.llm.provider, LlmProvider::Ollama);
        assert_eq!(config.llm.config.model, "llama3.1");
        assert_eq!(config.dedup.threshold, 0.9);
        assert_eq!(config.dedup.window_days, 14);
        assert_eq!(config.project_cache_ttl(), Duration::from_secs(60));
        // Untouched sections keep their defaults.
        assert_eq!(config.dedup.fetch_limit, 100);
        assert_eq!(config.resolver.code_fallback_project, "Code");
    }

    #[test]
    fn test_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sift.toml");
        std::fs::write(&path, "[dedup]\nthreshold = 0.75\n").unwrap();

        let config = PipelineConfig::from_file(&path).unwrap();
        assert_eq!(config.dedup.threshold, 0.75);

        let err = PipelineConfig::from_file(dir.path().join("sift.yaml"));
        assert!(err.is_err());
    }
}
