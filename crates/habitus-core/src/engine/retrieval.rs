//! Read-side queries over the similarity service

use super::core::LearningEngine;
use crate::store::{SearchHit, SearchQuery, with_timeout};
use crate::types::{Category, StoredPattern};
use std::cmp::Ordering;
use tracing::warn;

/// Fetch this many times `top_k` before the confidence filter
const OVERFETCH: usize = 4;

impl LearningEngine {
    /// Similarity search with a confidence post-filter, best match first.
    ///
    /// Service failures yield an empty list.
    pub async fn find_similar(
        &self,
        query_text: &str,
        category: Option<Category>,
        min_confidence: f32,
        top_k: usize,
    ) -> Vec<SearchHit> {
        if top_k == 0 {
            return Vec::new();
        }

        let query = SearchQuery::new(query_text, top_k.saturating_mul(OVERFETCH))
            .with_category(category)
            .with_threshold(self.config.retrieval.min_similarity);

        let mut hits: Vec<SearchHit> = self
            .search(&query)
            .await
            .into_iter()
            .filter(|hit| category.is_none_or(|c| hit.pattern.category == c))
            .filter(|hit| hit.pattern.confidence.value() >= min_confidence)
            .collect();

        hits.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(Ordering::Equal)
        });
        hits.truncate(top_k);
        hits
    }

    /// [`find_similar`](Self::find_similar) with the configured defaults
    pub async fn find_similar_default(
        &self,
        query_text: &str,
        category: Option<Category>,
    ) -> Vec<SearchHit> {
        let retrieval = &self.config.retrieval;
        self.find_similar(query_text, category, retrieval.min_confidence, retrieval.top_k)
            .await
    }

    /// Actionable preferences (corrections and tool preferences), highest
    /// confidence first, then most frequent
    pub async fn get_preferences(
        &self,
        category: Option<Category>,
        min_confidence: f32,
    ) -> Vec<StoredPattern> {
        let anchor = match category {
            Some(c) => format!("preferences for {}", c),
            None => "learned preferences".to_string(),
        };
        let query = SearchQuery::new(anchor, self.config.retrieval.preferences_top_k)
            .with_category(category);

        let mut preferences: Vec<StoredPattern> = self
            .search(&query)
            .await
            .into_iter()
            .map(|hit| hit.pattern)
            .filter(|p| category.is_none_or(|c| p.category == c))
            .filter(|p| p.pattern_type().is_preference())
            .filter(|p| p.confidence.value() >= min_confidence)
            .collect();

        preferences.sort_by(|a, b| {
            b.confidence
                .partial_cmp(&a.confidence)
                .unwrap_or(Ordering::Equal)
                .then_with(|| b.frequency.cmp(&a.frequency))
        });
        preferences
    }

    /// Whether something close to `text` is already stored in `category`
    pub async fn is_known(&self, text: &str, category: Category) -> bool {
        let threshold = self.config.dedup.known_threshold;
        let query = SearchQuery::new(text, 1)
            .with_category(Some(category))
            .with_threshold(threshold);

        self.search(&query)
            .await
            .iter()
            .any(|hit| hit.pattern.category == category && hit.similarity >= threshold)
    }

    async fn search(&self, query: &SearchQuery) -> Vec<SearchHit> {
        match with_timeout(self.config.timeouts.store, self.service.search(query)).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, query = %query.text, "Search failed");
                self.record_store_failure().await;
                Vec::new()
            }
        }
    }
}
