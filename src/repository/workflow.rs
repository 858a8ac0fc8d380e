//! Workflow state repository
//!
//! One table per workflow kind, one row per tracked pid, one boolean
//! column per stage.

use std::marker::PhantomData;

use chrono::Utc;
use sqlx::{sqlite::SqliteRow, FromRow, Pool, Sqlite};

use crate::{
    error::{AppError, AppResult},
    models::{Entry, OpenaccessEntry, OpenaccessStage, Stage, ThesesEntry, ThesesStage},
};

/// Table and stage metadata of one workflow
pub trait WorkflowKind: Send + Sync + 'static {
    const TABLE: &'static str;
    /// Column holding the source-system identifier
    const EXTERNAL_ID: &'static str;

    type Stage: Stage;
    type Entry: Entry<Stage = Self::Stage>
        + for<'r> FromRow<'r, SqliteRow>
        + Send
        + Unpin
        + 'static;
}

/// Theses imported from the campus information system
pub struct Theses;

impl WorkflowKind for Theses {
    const TABLE: &'static str = "workflows_theses";
    const EXTERNAL_ID: &'static str = "cms_id";
    type Stage = ThesesStage;
    type Entry = ThesesEntry;
}

/// Publications imported from the research information system
pub struct Openaccess;

impl WorkflowKind for Openaccess {
    const TABLE: &'static str = "workflows_openaccess";
    const EXTERNAL_ID: &'static str = "pure_id";
    type Stage = OpenaccessStage;
    type Entry = OpenaccessEntry;
}

pub struct WorkflowRepository<K: WorkflowKind> {
    pool: Pool<Sqlite>,
    kind: PhantomData<K>,
}

impl<K: WorkflowKind> Clone for WorkflowRepository<K> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<K: WorkflowKind> WorkflowRepository<K> {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self {
            pool,
            kind: PhantomData,
        }
    }

    /// Insert a new row with every stage flag unset
    pub async fn create(&self, pid: &str, external_id: &str) -> AppResult<K::Entry> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO {} (pid, {}, created_at, updated_at) VALUES (?, ?, ?, ?) RETURNING *",
            K::TABLE,
            K::EXTERNAL_ID
        );

        sqlx::query_as::<_, K::Entry>(&sql)
            .bind(pid)
            .bind(external_id)
            .bind(now)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                    AppError::Duplicate(format!("Workflow entry {} already exists", pid))
                }
                other => AppError::Database(other),
            })
    }

    /// Get entry by pid
    pub async fn resolve(&self, pid: &str) -> AppResult<K::Entry> {
        self.find(pid)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Workflow entry {} not found", pid)))
    }

    pub async fn find(&self, pid: &str) -> AppResult<Option<K::Entry>> {
        let sql = format!("SELECT * FROM {} WHERE pid = ?", K::TABLE);
        let entry = sqlx::query_as::<_, K::Entry>(&sql)
            .bind(pid)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    /// Set one stage flag, leaving the others untouched
    pub async fn set_state(&self, pid: &str, stage: K::Stage, value: bool) -> AppResult<K::Entry> {
        let sql = format!(
            "UPDATE {} SET {} = ?, updated_at = ? WHERE pid = ? RETURNING *",
            K::TABLE,
            stage.column()
        );

        sqlx::query_as::<_, K::Entry>(&sql)
            .bind(value)
            .bind(Utc::now())
            .bind(pid)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Workflow entry {} not found", pid)))
    }

    /// Entries whose prerequisite stage is done and whose `stage` flag is still open
    pub async fn get_ready_to(&self, stage: K::Stage) -> AppResult<Vec<K::Entry>> {
        let sql = match stage.prerequisite() {
            Some(prerequisite) => format!(
                "SELECT * FROM {} WHERE {} = 1 AND {} = 0 ORDER BY created_at, pid",
                K::TABLE,
                prerequisite.column(),
                stage.column()
            ),
            None => format!(
                "SELECT * FROM {} WHERE {} = 0 ORDER BY created_at, pid",
                K::TABLE,
                stage.column()
            ),
        };

        let entries = sqlx::query_as::<_, K::Entry>(&sql)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }
}
