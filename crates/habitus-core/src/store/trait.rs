//! Similarity service and audit store traits

use crate::error::StoreError;
use crate::event::ToolExecutionEvent;
use crate::types::{Category, PatternId, PatternMetadata, StoredPattern};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Nearest-neighbour query against stored patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub text: String,
    /// Restrict to one category
    pub category: Option<Category>,
    pub top_k: usize,
    /// Minimum similarity for a hit
    pub threshold: f32,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>, top_k: usize) -> Self {
        Self {
            text: text.into(),
            category: None,
            top_k,
            threshold: 0.0,
        }
    }

    pub fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// One search result, best first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Similarity to the query in [0, 1]
    pub similarity: f32,
    pub pattern: StoredPattern,
}

/// Service-side totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_count: usize,
    pub by_category: BTreeMap<Category, usize>,
}

/// Vector similarity service holding stored patterns
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SimilarityService: Send + Sync {
    /// Persist a new pattern and return its identifier
    async fn store(
        &self,
        text: &str,
        category: Category,
        confidence: f32,
        metadata: PatternMetadata,
    ) -> Result<PatternId, StoreError>;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, StoreError>;

    /// Raise confidence by `step` without passing `ceiling`, bump frequency
    /// and refresh last-seen; returns the updated record.
    ///
    /// The cap is applied against the current stored confidence, so
    /// concurrent reinforcements of one pattern never exceed `ceiling`.
    async fn record_reinforcement(
        &self,
        id: &PatternId,
        step: f32,
        ceiling: f32,
        note: &str,
    ) -> Result<StoredPattern, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;
}

/// Write-mostly store of raw events
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, event: &ToolExecutionEvent, significance: f32)
        -> Result<(), StoreError>;
}
