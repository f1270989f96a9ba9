//! In-memory similarity service

use super::r#trait::{SearchHit, SearchQuery, SimilarityService, StoreStats};
use super::similarity::dice_similarity;
use crate::error::StoreError;
use crate::types::{Category, PatternId, PatternMetadata, StoredPattern};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// One applied reinforcement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReinforcementRecord {
    pub id: PatternId,
    pub confidence_before: f32,
    pub confidence_after: f32,
    pub note: String,
    pub at: DateTime<Utc>,
}

/// Similarity service backed by a map, scoring with token-set Dice
#[derive(Debug, Clone, Default)]
pub struct InMemorySimilarityService {
    patterns: Arc<RwLock<HashMap<PatternId, StoredPattern>>>,
    reinforcements: Arc<RwLock<Vec<ReinforcementRecord>>>,
}

impl InMemorySimilarityService {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, id: &PatternId) -> Option<StoredPattern> {
        self.patterns.read().await.get(id).cloned()
    }

    /// All stored patterns, oldest first
    pub async fn patterns(&self) -> Vec<StoredPattern> {
        let mut all: Vec<StoredPattern> = self.patterns.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.first_seen.cmp(&b.first_seen));
        all
    }

    pub async fn len(&self) -> usize {
        self.patterns.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.patterns.read().await.is_empty()
    }

    pub async fn reinforcements(&self) -> Vec<ReinforcementRecord> {
        self.reinforcements.read().await.clone()
    }
}

#[async_trait]
impl SimilarityService for InMemorySimilarityService {
    async fn store(
        &self,
        text: &str,
        category: Category,
        confidence: f32,
        metadata: PatternMetadata,
    ) -> Result<PatternId, StoreError> {
        if text.trim().is_empty() {
            return Err(StoreError::unavailable("refusing to store empty text"));
        }

        let id = PatternId::new();
        let pattern = StoredPattern::new(id.clone(), text, category, confidence, metadata);
        self.patterns.write().await.insert(id.clone(), pattern);
        Ok(id)
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>, StoreError> {
        let patterns = self.patterns.read().await;
        let mut hits: Vec<SearchHit> = patterns
            .values()
            .filter(|p| query.category.is_none_or(|c| p.category == c))
            .map(|p| SearchHit {
                similarity: dice_similarity(&query.text, &p.text_content),
                pattern: p.clone(),
            })
            .filter(|hit| hit.similarity >= query.threshold)
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
                .then_with(|| {
                    b.pattern
                        .confidence
                        .partial_cmp(&a.pattern.confidence)
                        .unwrap_or(Ordering::Equal)
                })
                .then_with(|| a.pattern.first_seen.cmp(&b.pattern.first_seen))
        });
        hits.truncate(query.top_k);

        Ok(hits)
    }

    async fn record_reinforcement(
        &self,
        id: &PatternId,
        step: f32,
        ceiling: f32,
        note: &str,
    ) -> Result<StoredPattern, StoreError> {
        let updated = {
            let mut patterns = self.patterns.write().await;
            let pattern = patterns
                .get_mut(id)
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            let before = pattern.confidence.value();
            pattern.apply_reinforcement(step, ceiling);
            (before, pattern.clone())
        };

        let (confidence_before, pattern) = updated;
        self.reinforcements.write().await.push(ReinforcementRecord {
            id: id.clone(),
            confidence_before,
            confidence_after: pattern.confidence.value(),
            note: note.to_string(),
            at: Utc::now(),
        });

        Ok(pattern)
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let patterns = self.patterns.read().await;
        let mut stats = StoreStats {
            total_count: patterns.len(),
            ..StoreStats::default()
        };
        for pattern in patterns.values() {
            *stats.by_category.entry(pattern.category).or_insert(0) += 1;
        }
        Ok(stats)
    }
}
