//! End-to-end pipeline tests over in-memory fakes.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sift_core::traits::{
    EntityStore, GenerationOptions, Llm, LlmResponse, ProjectStore, RecentFilter,
};
use sift_core::types::{
    EntityKind, EventRecord, Message, MessageRole, NarrativeRecord, Project, SourceItem,
    StoredEntity, TaskRecord,
};
use sift_core::{PipelineConfig, Processor, SiftError, SiftResult};

#[derive(Default)]
struct MemoryStore {
    tasks: Mutex<Vec<TaskRecord>>,
    events: Mutex<Vec<EventRecord>>,
    narratives: Mutex<Vec<NarrativeRecord>>,
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn recent(&self, filter: &RecentFilter) -> SiftResult<Vec<StoredEntity>> {
        let entities = match filter.kind {
            EntityKind::Task => self
                .tasks
                .lock()
                .unwrap()
                .iter()
                .map(|t| StoredEntity {
                    id: t.id.clone(),
                    kind: EntityKind::Task,
                    text: t.title.clone(),
                    project_id: t.project_id.clone(),
                    completed: t.completed,
                    created_at: t.created_at,
                })
                .collect(),
            EntityKind::Event => self
                .events
                .lock()
                .unwrap()
                .iter()
                .map(|e| StoredEntity {
                    id: e.id.clone(),
                    kind: EntityKind::Event,
                    text: e.title.clone(),
                    project_id: e.project_id.clone(),
                    completed: false,
                    created_at: e.created_at,
                })
                .collect(),
            EntityKind::Narrative => Vec::new(),
        };
        Ok(entities)
    }

    async fn insert_task(&self, record: &TaskRecord) -> SiftResult<()> {
        self.tasks.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn insert_event(&self, record: &EventRecord) -> SiftResult<()> {
        self.events.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn insert_narrative(&self, record: &NarrativeRecord) -> SiftResult<()> {
        self.narratives.lock().unwrap().push(record.clone());
        Ok(())
    }
}

struct FixedProjects(Vec<Project>);

#[async_trait]
impl ProjectStore for FixedProjects {
    async fn active_projects(&self) -> SiftResult<Vec<Project>> {
        Ok(self.0.clone())
    }
}

/// Answers classification calls with a canned response and project
/// resolution calls with `{"project": null}`. Classification requests
/// carry a system message; resolution requests do not.
struct ScriptedClassifier {
    response: String,
    fail_on: Option<String>,
}

#[async_trait]
impl Llm for ScriptedClassifier {
    async fn generate(
        &self,
        messages: &[Message],
        _options: Option<GenerationOptions>,
    ) -> SiftResult<LlmResponse> {
        let is_classification = messages
            .first()
            .map(|m| m.role == MessageRole::System)
            .unwrap_or(false);
        if !is_classification {
            return Ok(LlmResponse {
                content: Some(r#"{"project": null}"#.to_string()),
            });
        }
        if let Some(trigger) = &self.fail_on {
            if messages.iter().any(|m| m.content.contains(trigger)) {
                return Err(SiftError::llm("provider unavailable"));
            }
        }
        Ok(LlmResponse {
            content: Some(self.response.clone()),
        })
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

fn processor(llm: ScriptedClassifier, store: Arc<MemoryStore>) -> Processor {
    let projects = FixedProjects(vec![Project::new("p1", "AcmeCo")]);
    Processor::new(
        PipelineConfig::default(),
        Arc::new(llm),
        store,
        Arc::new(projects),
    )
}

const TASK_RESPONSE: &str = r#"{
  "tasks": [
    {"title": "Send Q3 deck", "description": "Send the Q3 deck to AcmeCo", "urgency": "soon", "confidence": 0.9}
  ],
  "events": [],
  "narrative": null
}"#;

#[tokio::test]
async fn test_note_becomes_project_scoped_task() {
    let store = Arc::new(MemoryStore::default());
    let llm = ScriptedClassifier {
        response: TASK_RESPONSE.to_string(),
        fail_on: None,
    };
    let processor = processor(llm, store.clone());

    let item = SourceItem::Note {
        path: "/Clients/AcmeCo/notes.md".to_string(),
        text: "Please send the Q3 deck by Friday".to_string(),
    };
    let outcome = processor.process(&item).await;

    assert_eq!(outcome.tasks.len(), 1);
    assert_eq!(outcome.tasks[0].title, "Send Q3 deck");
    assert_eq!(outcome.tasks[0].project_id.as_deref(), Some("p1"));

    let stored = store.tasks.lock().unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn test_reprocessing_is_idempotent() {
    let store = Arc::new(MemoryStore::default());
    let llm = ScriptedClassifier {
        response: TASK_RESPONSE.to_string(),
        fail_on: None,
    };
    let processor = processor(llm, store.clone());

    let item = SourceItem::Note {
        path: "/Clients/AcmeCo/notes.md".to_string(),
        text: "Please send the Q3 deck by Friday".to_string(),
    };

    let first = processor.process(&item).await;
    assert_eq!(first.tasks.len(), 1);

    let second = processor.process(&item).await;
    assert_eq!(second.tasks.len(), 0);
    assert_eq!(second.duplicates_skipped, 1);
    assert_eq!(store.tasks.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_batch_isolates_failed_items() {
    let store = Arc::new(MemoryStore::default());
    let llm = ScriptedClassifier {
        response: TASK_RESPONSE.to_string(),
        fail_on: Some("poison".to_string()),
    };
    let processor = processor(llm, store.clone());

    let items = vec![
        SourceItem::Note {
            path: "/Clients/AcmeCo/notes.md".to_string(),
            text: "Please send the Q3 deck by Friday".to_string(),
        },
        SourceItem::Note {
            path: "/Clients/AcmeCo/poison.md".to_string(),
            text: "poison item".to_string(),
        },
    ];

    let batch = processor.process_batch(&items).await;
    assert_eq!(batch.items_processed, 2);
    assert_eq!(batch.items_failed, 1);
    assert_eq!(batch.outcome.tasks.len(), 1);
}

#[tokio::test]
async fn test_garbled_response_yields_nothing() {
    let store = Arc::new(MemoryStore::default());
    let llm = ScriptedClassifier {
        response: "```json\n{not valid\n```".to_string(),
        fail_on: None,
    };
    let processor = processor(llm, store.clone());

    let item = SourceItem::Note {
        path: "/notes/today.md".to_string(),
        text: "nothing actionable here".to_string(),
    };
    let outcome = processor.process(&item).await;

    assert_eq!(outcome.created(), 0);
    assert!(store.tasks.lock().unwrap().is_empty());
}
