//! In-memory build repository.
//!
//! Used for local development without PostgreSQL and by the API tests.
//! Changes are published straight onto the change feed while the write lock
//! is held, so events arrive in the order the writes were applied.

use std::collections::HashMap;

use async_trait::async_trait;
use buildtrack_core::build::BuildPatch;
use buildtrack_core::{Build, BuildChange, BuildId, BuildStage, BuildStatus, Environment};
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{BuildRepo, ChangeFeed, DbError, DbResult};

#[derive(Default)]
pub struct MemoryBuildRepo {
    builds: RwLock<HashMap<BuildId, Build>>,
    feed: ChangeFeed,
}

impl MemoryBuildRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_feed(feed: ChangeFeed) -> Self {
        Self {
            builds: RwLock::default(),
            feed,
        }
    }

    /// Remove a build, publishing a delete event.
    pub async fn remove(&self, id: BuildId) -> DbResult<Build> {
        let mut builds = self.builds.write().await;
        let removed = builds.remove(&id).ok_or(DbError::NotFound(id))?;
        self.feed.publish(BuildChange::Delete {
            old_record: removed.clone(),
        });
        Ok(removed)
    }

    pub async fn len(&self) -> usize {
        self.builds.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.builds.read().await.is_empty()
    }
}

#[async_trait]
impl BuildRepo for MemoryBuildRepo {
    async fn create(&self, environment: Environment, base_url: &str) -> DbResult<Build> {
        let now = Utc::now();
        let build = Build {
            id: BuildId::new(),
            environment,
            base_url: base_url.to_string(),
            status: BuildStatus::Queued,
            stage: BuildStage::Pending,
            progress: 0,
            artifact_url: None,
            external_run_id: None,
            created_at: now,
            updated_at: now,
        };

        let mut builds = self.builds.write().await;
        builds.insert(build.id, build.clone());
        self.feed.publish(BuildChange::Insert {
            record: build.clone(),
        });
        Ok(build)
    }

    async fn get(&self, id: BuildId) -> DbResult<Build> {
        self.builds
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(DbError::NotFound(id))
    }

    async fn list_recent(&self, limit: i64) -> DbResult<Vec<Build>> {
        let mut builds: Vec<Build> = self.builds.read().await.values().cloned().collect();
        builds.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });
        builds.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(builds)
    }

    async fn update(
        &self,
        id: BuildId,
        patch: &BuildPatch,
        expected_status: Option<BuildStatus>,
    ) -> DbResult<Build> {
        let mut builds = self.builds.write().await;
        let build = builds.get_mut(&id).ok_or(DbError::NotFound(id))?;
        if let Some(expected) = expected_status
            && build.status != expected
        {
            return Err(DbError::Conflict(format!(
                "build {} is {}, expected {}",
                id, build.status, expected
            )));
        }
        patch.apply_to(build);
        build.updated_at = Utc::now();
        let updated = build.clone();

        self.feed.publish(BuildChange::Update {
            record: updated.clone(),
        });
        Ok(updated)
    }

    async fn ping(&self) -> DbResult<()> {
        Ok(())
    }

    fn changes(&self) -> &ChangeFeed {
        &self.feed
    }
}
