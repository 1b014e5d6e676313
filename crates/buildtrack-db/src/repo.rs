//! Repository traits and implementations.

pub mod build;
pub mod memory;

pub use build::{BuildRecord, BuildRepo, PgBuildRepo};
pub use memory::MemoryBuildRepo;
