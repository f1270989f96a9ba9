//! Pattern data model

pub mod base;
pub mod pattern;

pub use base::{Category, Confidence, PatternId, PatternType};
pub use pattern::{CandidatePattern, PatternContext, PatternMetadata, StoredPattern};
