//! Build repository.

use async_trait::async_trait;
use buildtrack_core::build::BuildPatch;
use buildtrack_core::{Build, BuildId, BuildStatus, Environment};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::{ChangeFeed, DbError, DbResult};

/// A build row as stored in the database.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct BuildRecord {
    pub id: uuid::Uuid,
    pub environment: String,
    pub base_url: String,
    pub status: String,
    pub stage: String,
    pub progress: i32,
    pub artifact_url: Option<String>,
    pub external_run_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BuildRecord> for Build {
    type Error = DbError;

    fn try_from(record: BuildRecord) -> DbResult<Self> {
        let id = record.id;
        let corrupt = |field: &str, message: String| {
            DbError::Corrupt(format!("build {} {}: {}", id, field, message))
        };

        Ok(Build {
            id: BuildId::from_uuid(id),
            environment: record
                .environment
                .parse()
                .map_err(|e| corrupt("environment", e))?,
            base_url: record.base_url.clone(),
            status: record.status.parse().map_err(|e| corrupt("status", e))?,
            stage: record.stage.parse().map_err(|e| corrupt("stage", e))?,
            progress: u8::try_from(record.progress)
                .ok()
                .filter(|p| *p <= 100)
                .ok_or_else(|| corrupt("progress", record.progress.to_string()))?,
            artifact_url: record.artifact_url,
            external_run_id: record.external_run_id,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

/// Storage for build records.
///
/// Every successful `create` and `update` is published on the repository's
/// change feed, either by the store itself or by a database trigger.
#[async_trait]
pub trait BuildRepo: Send + Sync {
    /// Insert a new build in `queued`/`pending` state with zero progress.
    async fn create(&self, environment: Environment, base_url: &str) -> DbResult<Build>;

    async fn get(&self, id: BuildId) -> DbResult<Build>;

    /// Newest builds first.
    async fn list_recent(&self, limit: i64) -> DbResult<Vec<Build>>;

    /// Apply a partial update and return the stored row.
    ///
    /// With `expected_status` set, the update only applies while the stored
    /// status still equals it; otherwise `DbError::Conflict`.
    async fn update(
        &self,
        id: BuildId,
        patch: &BuildPatch,
        expected_status: Option<BuildStatus>,
    ) -> DbResult<Build>;

    /// Cheap liveness check.
    async fn ping(&self) -> DbResult<()>;

    fn changes(&self) -> &ChangeFeed;
}

/// PostgreSQL implementation of BuildRepo.
pub struct PgBuildRepo {
    pool: PgPool,
    feed: ChangeFeed,
}

impl PgBuildRepo {
    /// The feed is filled by [`crate::feed::spawn_pg_listener`], not by this
    /// repository.
    pub fn new(pool: PgPool, feed: ChangeFeed) -> Self {
        Self { pool, feed }
    }
}

#[async_trait]
impl BuildRepo for PgBuildRepo {
    async fn create(&self, environment: Environment, base_url: &str) -> DbResult<Build> {
        let record = sqlx::query_as::<_, BuildRecord>(
            r#"
            INSERT INTO builds (id, environment, base_url, status, stage, progress, created_at, updated_at)
            VALUES ($1, $2, $3, 'queued', 'pending', 0, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(uuid::Uuid::now_v7())
        .bind(environment.as_str())
        .bind(base_url)
        .fetch_one(&self.pool)
        .await?;
        record.try_into()
    }

    async fn get(&self, id: BuildId) -> DbResult<Build> {
        let record = sqlx::query_as::<_, BuildRecord>("SELECT * FROM builds WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::NotFound(id))?;
        record.try_into()
    }

    async fn list_recent(&self, limit: i64) -> DbResult<Vec<Build>> {
        let records = sqlx::query_as::<_, BuildRecord>(
            "SELECT * FROM builds ORDER BY created_at DESC, id DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        records.into_iter().map(Build::try_from).collect()
    }

    async fn update(
        &self,
        id: BuildId,
        patch: &BuildPatch,
        expected_status: Option<BuildStatus>,
    ) -> DbResult<Build> {
        let record = sqlx::query_as::<_, BuildRecord>(
            r#"
            UPDATE builds SET
                status = COALESCE($2, status),
                stage = COALESCE($3, stage),
                progress = COALESCE($4, progress),
                artifact_url = COALESCE($5, artifact_url),
                external_run_id = COALESCE($6, external_run_id)
            WHERE id = $1 AND ($7::TEXT IS NULL OR status = $7)
            RETURNING *
            "#,
        )
        .bind(id.as_uuid())
        .bind(patch.status.map(|s| s.as_str()))
        .bind(patch.stage.map(|s| s.as_str()))
        .bind(patch.progress.map(i32::from))
        .bind(patch.artifact_url.as_deref())
        .bind(patch.external_run_id.as_deref())
        .bind(expected_status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await?;

        match record {
            Some(record) => record.try_into(),
            None => {
                // Either the row is missing or the precondition failed.
                let current = self.get(id).await?;
                Err(DbError::Conflict(format!(
                    "build {} is {}, expected {}",
                    id,
                    current.status,
                    expected_status.map(|s| s.as_str()).unwrap_or("any"),
                )))
            }
        }
    }

    async fn ping(&self) -> DbResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn changes(&self) -> &ChangeFeed {
        &self.feed
    }
}
