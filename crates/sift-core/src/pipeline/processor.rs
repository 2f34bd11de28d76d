//! Central orchestrator: normalize, resolve, classify, dedup, score, persist.

use std::sync::Arc;

use crate::cache::ProjectCache;
use crate::config::PipelineConfig;
use crate::error::SiftResult;
use crate::pipeline::dedup::DuplicateDetector;
use crate::pipeline::materialize::EntityMaterializer;
use crate::pipeline::normalize::normalize;
use crate::pipeline::parser::parse_candidates;
use crate::pipeline::prompts::classification_prompt;
use crate::pipeline::resolver::ProjectResolver;
use crate::pipeline::score::{passes_filter, significance};
use crate::traits::{EntityStore, GenerationOptions, Llm, ProjectStore, ResponseFormat};
use crate::types::{
    BatchOutcome, EntityKind, Message, PersistedEntity, ProcessOutcome, SourceItem,
};

/// Runs source items through the full ingestion pipeline.
pub struct Processor {
    llm: Arc<dyn Llm>,
    resolver: ProjectResolver,
    detector: DuplicateDetector,
    materializer: EntityMaterializer,
}

impl Processor {
    /// Wire up the pipeline stages from a config and the two stores.
    pub fn new(
        config: PipelineConfig,
        llm: Arc<dyn Llm>,
        entity_store: Arc<dyn EntityStore>,
        project_store: Arc<dyn ProjectStore>,
    ) -> Self {
        let cache = Arc::new(ProjectCache::with_ttl(
            project_store,
            config.project_cache_ttl(),
        ));
        let resolver = ProjectResolver::new(cache, llm.clone(), config.resolver);
        let detector = DuplicateDetector::new(entity_store.clone(), config.dedup);
        let materializer = EntityMaterializer::new(entity_store);
        Self {
            llm,
            resolver,
            detector,
            materializer,
        }
    }

    /// Process one source item end to end.
    ///
    /// A classification failure degrades the item to an empty outcome;
    /// later per-candidate failures only drop that candidate.
    pub async fn process(&self, item: &SourceItem) -> ProcessOutcome {
        match self.try_process(item).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::warn!("item degraded to empty outcome: {}", e);
                ProcessOutcome::default()
            }
        }
    }

    /// Like [`Processor::process`], but surfaces the classification error
    /// so batch callers can count it.
    pub async fn try_process(&self, item: &SourceItem) -> SiftResult<ProcessOutcome> {
        let envelope = normalize(item);
        let project = self.resolver.resolve(&envelope).await;
        let project_name = project.as_ref().map(|p| p.name.as_str());

        let messages = [
            Message::system(classification_prompt(project_name)),
            Message::user(envelope.text.clone()),
        ];
        let options = GenerationOptions {
            temperature: Some(0.0),
            response_format: Some(ResponseFormat::Json),
            ..Default::default()
        };
        let response = self.llm.generate(&messages, Some(options)).await?;

        let candidates = parse_candidates(response.content_or_empty(), &envelope);
        let mut outcome = ProcessOutcome::default();
        let project_id = project.as_ref().map(|p| p.id.as_str());

        for candidate in candidates {
            let kind = candidate.kind();
            // Narratives are date-scoped log lines; same-day repeats are
            // expected, so they skip the duplicate check.
            if kind != EntityKind::Narrative {
                let verdict = self.detector.check(&candidate, project_id).await;
                if verdict.is_duplicate {
                    tracing::debug!(text = candidate.display_text(), "skipping duplicate");
                    outcome.duplicates_skipped += 1;
                    continue;
                }
            }

            let score = significance(&candidate, project.is_some());
            if !passes_filter(&candidate, score) {
                tracing::debug!(
                    text = candidate.display_text(),
                    score,
                    "dropping low-significance candidate"
                );
                outcome.low_significance_dropped += 1;
                continue;
            }

            let display_text = candidate.display_text().to_string();
            match self
                .materializer
                .create(candidate, project.as_ref(), score)
                .await
            {
                Some(persisted) => {
                    // Cached "not a duplicate" verdicts are stale now that
                    // the record exists.
                    if kind != EntityKind::Narrative {
                        self.detector
                            .record_created(kind, &display_text, persisted.as_stored());
                    }
                    match persisted {
                        PersistedEntity::Task(record) => outcome.tasks.push(record),
                        PersistedEntity::Event(record) => outcome.events.push(record),
                        PersistedEntity::Narrative(record) => outcome.narratives.push(record),
                    }
                }
                None => {}
            }
        }
        Ok(outcome)
    }

    /// Process a batch strictly in order. One failed item never stops the
    /// rest; it shows up in `items_failed`.
    pub async fn process_batch(&self, items: &[SourceItem]) -> BatchOutcome {
        let mut batch = BatchOutcome::default();
        for item in items {
            match self.try_process(item).await {
                Ok(outcome) => batch.outcome.merge(outcome),
                Err(e) => {
                    tracing::warn!("batch item failed: {}", e);
                    batch.items_failed += 1;
                }
            }
            batch.items_processed += 1;
        }
        batch
    }
}
