//! Persistence traits.

use async_trait::async_trait;

use crate::error::SiftResult;
use crate::types::{
    EntityKind, EventRecord, NarrativeRecord, Project, StoredEntity, TaskRecord,
};

/// Query for recently created same-kind records, used by the duplicate
/// detector. Results must come back newest first.
#[derive(Debug, Clone)]
pub struct RecentFilter {
    pub kind: EntityKind,
    /// Look-back window in days.
    pub window_days: i64,
    /// Optional project scope.
    pub project_id: Option<String>,
    /// Whether completed tasks count as duplicate candidates.
    pub include_completed: bool,
    /// Hard row cap.
    pub limit: usize,
}

impl RecentFilter {
    /// Create a filter with the default 7-day window and 100-row cap.
    pub fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            window_days: 7,
            project_id: None,
            include_completed: false,
            limit: 100,
        }
    }

    /// Scope to a project.
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }
}

/// Store of persisted entities (tasks, events, narrative entries).
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Fetch recent records matching the filter, newest first.
    async fn recent(&self, filter: &RecentFilter) -> SiftResult<Vec<StoredEntity>>;

    /// Insert a task record.
    async fn insert_task(&self, task: &TaskRecord) -> SiftResult<()>;

    /// Insert an event record.
    async fn insert_event(&self, event: &EventRecord) -> SiftResult<()>;

    /// Insert a narrative record.
    async fn insert_narrative(&self, entry: &NarrativeRecord) -> SiftResult<()>;
}

/// Read-only view of tracked projects.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Fetch all projects with status `active`.
    async fn active_projects(&self) -> SiftResult<Vec<Project>>;
}
