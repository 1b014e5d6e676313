//! Core domain types and traits for BuildTrack.
//!
//! This crate contains:
//! - Build identifiers and the build record
//! - Lifecycle enums (environment, status, stage)
//! - Validation of trigger requests and status callbacks
//! - The dispatcher trait for handing builds to an external CI system
//! - Service configuration (CI target, webhook authentication)
//! - Change feed events

pub mod build;
pub mod change;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod id;
pub mod secret;
pub mod validate;

pub use build::{Build, BuildStage, BuildStatus, Environment};
pub use change::BuildChange;
pub use error::{Error, Result};
pub use id::BuildId;
