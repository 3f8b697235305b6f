//! Progression Module - Core of the Career Roadmap Engine
//!
//! Turns roadmap exploration into XP, levels and achievements.
//!
//! Architecture:
//! - Graph: The ordered career stages with prerequisites
//! - Leveling: Pure XP → level math
//! - Ledger: Persistent achievements and XP totals
//! - Tracker: Per-stage exploration, completion and cursor
//! - XP: Idempotent awarding across tracker and ledger
//! - Journey: Composite owner with coordinated reset

pub mod graph;
pub mod journey;
pub mod ledger;
pub mod leveling;
pub mod notify;
pub mod profile;
pub mod tracker;
pub mod xp;

pub use graph::*;
pub use journey::*;
pub use ledger::*;
pub use leveling::*;
pub use notify::*;
pub use profile::*;
pub use tracker::*;
pub use xp::*;
