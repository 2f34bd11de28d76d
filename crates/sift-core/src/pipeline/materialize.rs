//! Turns surviving candidates into persisted records.

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::traits::EntityStore;
use crate::types::{
    CandidateEntity, EventRecord, NarrativeRecord, PersistedEntity, Project, TaskRecord,
};

/// Writes candidates that survived dedup and scoring to the store.
pub struct EntityMaterializer {
    store: Arc<dyn EntityStore>,
}

impl EntityMaterializer {
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Persist one candidate. A store failure is logged and yields `None`;
    /// the rest of the batch is unaffected.
    pub async fn create(
        &self,
        candidate: CandidateEntity,
        project: Option<&Project>,
        significance: f64,
    ) -> Option<PersistedEntity> {
        let id = Uuid::new_v4().to_string();
        let project_id = project.map(|p| p.id.clone());
        let created_at = Utc::now();

        match candidate {
            CandidateEntity::Task(c) => {
                let record = TaskRecord {
                    id,
                    title: c.title,
                    description: c.description,
                    urgency: c.urgency,
                    due_date: c.due_date,
                    confidence: c.confidence,
                    source: c.source,
                    detected_from: c.detected_from,
                    project_id,
                    completed: false,
                    created_at,
                };
                match self.store.insert_task(&record).await {
                    Ok(()) => Some(PersistedEntity::Task(record)),
                    Err(e) => {
                        tracing::warn!(title = %record.title, "task insert failed: {}", e);
                        None
                    }
                }
            }
            CandidateEntity::Event(c) => {
                let record = EventRecord {
                    id,
                    title: c.title,
                    start_time: c.start_time,
                    end_time: c.end_time,
                    location: c.location,
                    attendees: c.attendees,
                    category: c.category,
                    project_id,
                    created_at,
                };
                match self.store.insert_event(&record).await {
                    Ok(()) => Some(PersistedEntity::Event(record)),
                    Err(e) => {
                        tracing::warn!(title = %record.title, "event insert failed: {}", e);
                        None
                    }
                }
            }
            CandidateEntity::Narrative(c) => {
                let record = NarrativeRecord {
                    id,
                    headline: c.headline,
                    bullets: c.bullets,
                    date: c.date,
                    source: c.source,
                    source_file: c.source_file,
                    source_id: c.source_id,
                    significance,
                    project_id,
                    created_at,
                };
                match self.store.insert_narrative(&record).await {
                    Ok(()) => Some(PersistedEntity::Narrative(record)),
                    Err(e) => {
                        tracing::warn!(headline = %record.headline, "narrative insert failed: {}", e);
                        None
                    }
                }
            }
        }
    }
}
