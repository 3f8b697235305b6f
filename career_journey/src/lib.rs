//! Career Journey
//!
//! A career roadmap progression engine with:
//! - XP and level tracking with per-level scaling
//! - Persistent achievement ledger
//! - Per-stage exploration and prerequisite unlocking
//! - Idempotent awarding and coordinated reset

pub mod cli;
pub mod config;
pub mod progression;
pub mod storage;

pub use config::JourneyConfig;
pub use progression::*;
pub use storage::{InMemoryStore, KeyValueStore, SharedStore, SqliteStore, StorageError};
