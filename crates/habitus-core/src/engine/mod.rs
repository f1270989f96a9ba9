//! Deduplication, reinforcement and retrieval
//!
//! - `core`: engine struct, counters and statistics
//! - `dedup`: insert-or-reinforce resolution of candidates
//! - `retrieval`: similarity search and preference listing

pub mod core;
pub mod dedup;
pub mod retrieval;


pub use core::{
    EngineStats, LearningEngine, PatternStatistics, SharedLearningEngine, create_learning_engine,
};
pub use dedup::{DiscardReason, DuplicateLookup, ExtractionPass, ResolvedPattern, Resolution};
