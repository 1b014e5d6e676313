//! Row-level change events on builds.

use serde::{Deserialize, Serialize};

use crate::{Build, BuildId};

/// A change to the builds table, as delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildChange {
    Insert { record: Build },
    Update { record: Build },
    Delete { old_record: Build },
}

impl BuildChange {
    pub fn build_id(&self) -> BuildId {
        match self {
            BuildChange::Insert { record } | BuildChange::Update { record } => record.id,
            BuildChange::Delete { old_record } => old_record.id,
        }
    }
}
