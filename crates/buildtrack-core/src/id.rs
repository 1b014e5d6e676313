//! Build identifiers.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for a build.
/// Uses UUIDv7 for time-ordered, sortable IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[display("{_0}")]
#[serde(transparent)]
pub struct BuildId(Uuid);

impl BuildId {
    /// Create a new unique BuildId using UUIDv7.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First eight characters, the form dashboards and the CLI show.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for BuildId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for BuildId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<BuildId> for Uuid {
    fn from(id: BuildId) -> Self {
        id.0
    }
}

impl std::str::FromStr for BuildId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_ids_are_v7_and_distinct() {
        let first = BuildId::new();
        let second = BuildId::new();
        assert_ne!(first, second);
        assert_eq!(first.as_uuid().get_version_num(), 7);
    }

    #[test]
    fn test_parse_and_display_round_trip() {
        let id: BuildId = "0190b3c4-5d6e-7f80-9a1b-2c3d4e5f6a7b".parse().unwrap();
        assert_eq!(id.to_string(), "0190b3c4-5d6e-7f80-9a1b-2c3d4e5f6a7b");
        assert_eq!(id.short(), "0190b3c4");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!("not-a-build".parse::<BuildId>().is_err());
    }
}
