//! SQLite persistence using a shared connection.

use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use uuid::Uuid;

use sift_core::error::{SiftError, SiftResult};
use sift_core::traits::{EntityStore, ProjectStore, RecentFilter};
use sift_core::types::{
    EntityKind, EventRecord, NarrativeRecord, Project, ProjectStatus, StoredEntity, TaskRecord,
};

/// SQLite-backed entity and project store.
///
/// One connection behind a mutex; the pipeline is sequential, so
/// contention is not a concern.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) the database at `db_path`. `:memory:` is supported
    /// for tests.
    pub fn new(db_path: impl AsRef<Path>) -> SiftResult<Self> {
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = if db_path.as_ref().to_str() == Some(":memory:") {
            Connection::open_in_memory()
        } else {
            Connection::open(db_path.as_ref())
        }
        .map_err(|e| SiftError::store(e.to_string()))?;

        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.create_tables()?;
        tracing::debug!(path = %db_path.as_ref().display(), "opened sift database");
        Ok(store)
    }

    fn create_tables(&self) -> SiftResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS projects (
                id         TEXT PRIMARY KEY,
                name       TEXT NOT NULL,
                status     TEXT NOT NULL DEFAULT 'active',
                kind       TEXT
            );

            CREATE TABLE IF NOT EXISTS tasks (
                id            TEXT PRIMARY KEY,
                title         TEXT NOT NULL,
                description   TEXT NOT NULL DEFAULT '',
                urgency       TEXT NOT NULL DEFAULT 'soon',
                due_date      TEXT,
                confidence    REAL NOT NULL DEFAULT 0.8,
                project_id    TEXT,
                source        TEXT NOT NULL DEFAULT 'unknown',
                detected_from TEXT NOT NULL DEFAULT '',
                completed     INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_tasks_created_at ON tasks(created_at);

            CREATE TABLE IF NOT EXISTS events (
                id         TEXT PRIMARY KEY,
                title      TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time   TEXT,
                location   TEXT,
                attendees  TEXT NOT NULL DEFAULT '[]',
                category   TEXT NOT NULL DEFAULT 'work',
                project_id TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_events_created_at ON events(created_at);

            CREATE TABLE IF NOT EXISTS narratives (
                id           TEXT PRIMARY KEY,
                headline     TEXT NOT NULL,
                bullets      TEXT NOT NULL DEFAULT '[]',
                date         TEXT NOT NULL,
                source       TEXT NOT NULL DEFAULT 'note',
                significance REAL NOT NULL DEFAULT 0.5,
                project_id   TEXT,
                source_file  TEXT,
                source_id    TEXT,
                created_at   TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_narratives_created_at ON narratives(created_at);
            "#,
        )
        .map_err(|e| SiftError::store(e.to_string()))?;
        Ok(())
    }

    /// Insert or update a project. Callers seed projects; the pipeline
    /// itself only reads them.
    pub fn upsert_project(&self, project: &Project) -> SiftResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO projects (id, name, status, kind)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                status = excluded.status,
                kind = excluded.kind
            "#,
            params![
                project.id,
                project.name,
                project.status.as_str(),
                project.kind,
            ],
        )
        .map_err(|e| SiftError::store(e.to_string()))?;
        Ok(())
    }

    /// Convenience for seeding: create a project with a fresh id.
    pub fn create_project(&self, name: &str) -> SiftResult<Project> {
        let project = Project::new(Uuid::new_v4().to_string(), name);
        self.upsert_project(&project)?;
        Ok(project)
    }

    /// Mark a task completed. Completed tasks stop matching duplicate
    /// checks unless the detector is configured to include them.
    pub fn complete_task(&self, task_id: &str) -> SiftResult<()> {
        let conn = self.conn.lock().unwrap();
        let changed = conn
            .execute(
                "UPDATE tasks SET completed = 1 WHERE id = ?1",
                params![task_id],
            )
            .map_err(|e| SiftError::store(e.to_string()))?;
        if changed == 0 {
            return Err(SiftError::store(format!("no such task: {}", task_id)));
        }
        Ok(())
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn recent(&self, filter: &RecentFilter) -> SiftResult<Vec<StoredEntity>> {
        let cutoff = (Utc::now() - Duration::days(filter.window_days)).to_rfc3339();
        let conn = self.conn.lock().unwrap();

        let (table, text_column) = match filter.kind {
            EntityKind::Task => ("tasks", "title"),
            EntityKind::Event => ("events", "title"),
            EntityKind::Narrative => ("narratives", "headline"),
        };

        let mut sql = format!(
            "SELECT id, {}, project_id, created_at{} FROM {} WHERE created_at >= ?1",
            text_column,
            if filter.kind == EntityKind::Task {
                ", completed"
            } else {
                ""
            },
            table,
        );
        if filter.kind == EntityKind::Task && !filter.include_completed {
            sql.push_str(" AND completed = 0");
        }
        if filter.project_id.is_some() {
            sql.push_str(" AND project_id = ?2");
        }
        sql.push_str(&format!(
            " ORDER BY created_at DESC LIMIT {}",
            filter.limit
        ));

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| SiftError::store(e.to_string()))?;

        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<StoredEntity> {
            Ok(StoredEntity {
                id: row.get(0)?,
                kind: filter.kind,
                text: row.get(1)?,
                project_id: row.get(2)?,
                created_at: parse_timestamp(&row.get::<_, String>(3)?),
                completed: if filter.kind == EntityKind::Task {
                    row.get::<_, i32>(4)? != 0
                } else {
                    false
                },
            })
        };

        let rows = match &filter.project_id {
            Some(project_id) => stmt
                .query_map(params![cutoff, project_id], map_row)
                .map_err(|e| SiftError::store(e.to_string()))?
                .collect::<Result<Vec<_>, _>>(),
            None => stmt
                .query_map(params![cutoff], map_row)
                .map_err(|e| SiftError::store(e.to_string()))?
                .collect::<Result<Vec<_>, _>>(),
        };
        rows.map_err(|e| SiftError::store(e.to_string()))
    }

    async fn insert_task(&self, record: &TaskRecord) -> SiftResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO tasks (
                id, title, description, urgency, due_date, confidence,
                project_id, source, detected_from, completed, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                record.id,
                record.title,
                record.description,
                record.urgency.as_str(),
                record.due_date.map(|d: NaiveDate| d.to_string()),
                record.confidence,
                record.project_id,
                record.source.as_str(),
                record.detected_from,
                record.completed as i32,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| SiftError::store(e.to_string()))?;
        Ok(())
    }

    async fn insert_event(&self, record: &EventRecord) -> SiftResult<()> {
        let attendees = serde_json::to_string(&record.attendees)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO events (
                id, title, start_time, end_time, location, attendees,
                category, project_id, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                record.id,
                record.title,
                record.start_time.to_rfc3339(),
                record.end_time.map(|t| t.to_rfc3339()),
                record.location,
                attendees,
                record.category.as_str(),
                record.project_id,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| SiftError::store(e.to_string()))?;
        Ok(())
    }

    async fn insert_narrative(&self, record: &NarrativeRecord) -> SiftResult<()> {
        let bullets = serde_json::to_string(&record.bullets)?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO narratives (
                id, headline, bullets, date, source, significance,
                project_id, source_file, source_id, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                record.id,
                record.headline,
                bullets,
                record.date.to_rfc3339(),
                record.source.as_str(),
                record.significance,
                record.project_id,
                record.source_file,
                record.source_id,
                record.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| SiftError::store(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ProjectStore for SqliteStore {
    async fn active_projects(&self) -> SiftResult<Vec<Project>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, name, status, kind FROM projects WHERE status = 'active'")
            .map_err(|e| SiftError::store(e.to_string()))?;

        let projects = stmt
            .query_map([], |row| {
                Ok(Project {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    status: ProjectStatus::from_str_or_default(&row.get::<_, String>(2)?),
                    kind: row.get(3)?,
                })
            })
            .map_err(|e| SiftError::store(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SiftError::store(e.to_string()))?;

        Ok(projects)
    }
}
