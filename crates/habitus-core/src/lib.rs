//! Habitus: preference learning for coding agents
//!
//! This crate watches tool executions reported by an agent host and learns
//! durable preferences from them:
//! - Throttles and scores every event, discarding routine ones cheaply
//! - Extracts corrections, tool preferences, workflows and project context
//! - Deduplicates against a similarity service, reinforcing what it has
//!   already seen instead of storing it twice
//! - Answers similarity and preference queries for prompt construction
//!
//! # Example
//!
//! ```rust,ignore
//! use habitus_core::{CaptureHook, InMemorySimilarityService, LearningConfig, ToolExecutionEvent};
//! use habitus_core::engine::create_learning_engine;
//! use std::sync::Arc;
//!
//! let config = LearningConfig::default();
//! let engine = create_learning_engine(config.clone(), Arc::new(InMemorySimilarityService::new()));
//! let hook = CaptureHook::new(config, engine.clone());
//!
//! let event = ToolExecutionEvent::new("Bash")
//!     .with_arg("command", "pip install requests")
//!     .with_result("Actually, use uv not pip");
//! let result = hook.process(event).await;
//! assert!(result.accepted);
//!
//! let prefs = engine.get_preferences(None, 0.7).await;
//! ```

pub mod category;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod history;
pub mod hook;
pub mod patterns;
pub mod rate_limiter;
pub mod significance;
pub mod store;
pub mod types;

pub use config::LearningConfig;
pub use engine::{
    EngineStats, LearningEngine, PatternStatistics, Resolution, SharedLearningEngine,
    create_learning_engine,
};
pub use error::{CaptureError, ConfigError, RejectReason, StoreError};
pub use event::{ToolExecutionEvent, ToolKind};
pub use history::{ToolHistory, ToolInvocation};
pub use hook::{CaptureHook, CaptureResult, CaptureStats, CapturedPattern, HookStats};
pub use patterns::PatternExtractor;
pub use rate_limiter::{Clock, ManualClock, RateLimiter, SystemClock};
pub use significance::SignificanceScorer;
pub use store::{
    AuditStore, InMemoryAuditStore, InMemorySimilarityService, SearchHit, SearchQuery,
    SimilarityService, StoreStats,
};
pub use types::{
    CandidatePattern, Category, Confidence, PatternContext, PatternId, PatternType, StoredPattern,
};
