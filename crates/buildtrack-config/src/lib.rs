//! KDL configuration parsing for BuildTrack.
//!
//! This crate handles:
//! - Parsing the server configuration file (buildtrack.kdl)
//! - Layering environment/CLI overrides on top of the file

pub mod error;
pub mod system;

pub use error::{ConfigError, ConfigResult};
pub use system::{ConfigOverrides, ServerConfig, StoreConfig, parse_system_config};
