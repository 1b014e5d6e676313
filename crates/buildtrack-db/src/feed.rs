//! Change feed for the builds table.
//!
//! PostgreSQL announces row changes through `pg_notify` from a table trigger;
//! [`spawn_pg_listener`] reads the changed rows and relays them into a
//! process-local broadcast channel.
//! The in-memory repository publishes into the same channel directly.

use buildtrack_core::{Build, BuildChange, BuildId};
use serde::Deserialize;
use sqlx::PgPool;
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::{BuildRecord, BuildRepo, DbError, DbResult, PgBuildRepo};

/// Channel the migration's trigger notifies on.
pub const CHANNEL: &str = "build_changes";

const CAPACITY: usize = 256;

/// Broadcast of build changes to any number of subscribers.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<BuildChange>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BuildChange> {
        self.tx.subscribe()
    }

    /// Publish a change. Having no subscribers is not an error.
    pub fn publish(&self, change: BuildChange) {
        let build_id = change.build_id();
        match self.tx.send(change) {
            Ok(receivers) => debug!(build_id = %build_id, receivers, "Published build change"),
            Err(_) => debug!(build_id = %build_id, "No subscribers for build change"),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Payload produced by the `builds_notify_change` trigger.
///
/// Inserts and updates carry only the id; deletes carry the old row unless it
/// was too large for a notification.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Notification {
    Insert {
        id: uuid::Uuid,
    },
    Update {
        id: uuid::Uuid,
    },
    Delete {
        id: uuid::Uuid,
        #[serde(default)]
        old_record: Option<BuildRecord>,
    },
}

impl Notification {
    fn decode(payload: &str) -> serde_json::Result<Self> {
        serde_json::from_str(payload)
    }
}

/// Turn a notification into a change event, reading the row back for inserts
/// and updates. `None` when there is nothing to publish.
async fn resolve(repo: &PgBuildRepo, notification: Notification) -> DbResult<Option<BuildChange>> {
    let current = |id: uuid::Uuid| async move {
        match repo.get(BuildId::from_uuid(id)).await {
            Ok(build) => Ok(Some(build)),
            Err(DbError::NotFound(id)) => {
                debug!(build_id = %id, "Build gone before its change was read");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    };

    match notification {
        Notification::Insert { id } => Ok(current(id)
            .await?
            .map(|record| BuildChange::Insert { record })),
        Notification::Update { id } => Ok(current(id)
            .await?
            .map(|record| BuildChange::Update { record })),
        Notification::Delete { old_record, .. } => match old_record {
            Some(record) => Ok(Some(BuildChange::Delete {
                old_record: Build::try_from(record)?,
            })),
            None => Ok(None),
        },
    }
}

/// Listen for build notifications and relay them into `feed`.
///
/// `PgListener` reconnects on its own after connection loss; notifications
/// sent while disconnected are lost. Rows are read back after commit, so an
/// event carries the row as it is when read, which may already include later
/// updates.
pub async fn spawn_pg_listener(pool: &PgPool, feed: ChangeFeed) -> DbResult<JoinHandle<()>> {
    let mut listener = PgListener::connect_with(pool).await?;
    listener.listen(CHANNEL).await?;
    info!(channel = CHANNEL, "Listening for build changes");

    let repo = PgBuildRepo::new(pool.clone(), feed.clone());
    let handle = tokio::spawn(async move {
        loop {
            let notification = match listener.recv().await {
                Ok(notification) => notification,
                Err(e) => {
                    error!(error = %e, "Build change listener error");
                    tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    continue;
                }
            };

            let notification = match Notification::decode(notification.payload()) {
                Ok(notification) => notification,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed build notification");
                    continue;
                }
            };

            if let Notification::Delete {
                id,
                old_record: None,
            } = &notification
            {
                warn!(build_id = %id, "Delete notification without a row; not published");
            }

            match resolve(&repo, notification).await {
                Ok(Some(change)) => feed.publish(change),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Failed to read back changed build"),
            }
        }
    });

    Ok(handle)
}
