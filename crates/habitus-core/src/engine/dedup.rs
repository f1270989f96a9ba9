//! Deduplication and reinforcement
//!
//! Each candidate is reconciled against the similarity service: a close
//! enough stored pattern in the same category is reinforced, anything else
//! is inserted. Service failures never surface as errors; a failed lookup
//! falls through to insert and a failed write drops the candidate.

use super::core::LearningEngine;
use crate::error::StoreError;
use crate::store::{SearchHit, SearchQuery, with_timeout};
use crate::types::{CandidatePattern, PatternId};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Why a candidate was not persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscardReason {
    /// Same description already accepted earlier in the pass
    DuplicateInPass,
    /// The insert or reinforcement call failed
    StoreUnavailable,
}

/// Outcome of resolving one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum Resolution {
    Inserted(PatternId),
    Reinforced(PatternId),
    Discarded(DiscardReason),
}

impl Resolution {
    pub fn pattern_id(&self) -> Option<&PatternId> {
        match self {
            Self::Inserted(id) | Self::Reinforced(id) => Some(id),
            Self::Discarded(_) => None,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }

    pub fn is_reinforced(&self) -> bool {
        matches!(self, Self::Reinforced(_))
    }

    pub fn is_discarded(&self) -> bool {
        matches!(self, Self::Discarded(_))
    }
}

/// Result of asking the service for an existing equivalent
#[derive(Debug)]
pub enum DuplicateLookup {
    /// A stored pattern above the merge threshold
    Found(SearchHit),
    NotFound,
    /// The search failed; treated as not found
    Unavailable(StoreError),
}

/// Descriptions accepted so far in one extraction pass
#[derive(Debug, Default)]
pub struct ExtractionPass {
    accepted: HashSet<String>,
}

impl ExtractionPass {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, candidate: &CandidatePattern) -> bool {
        self.accepted.contains(&candidate.dedup_key())
    }

    fn accept(&mut self, candidate: &CandidatePattern) {
        self.accepted.insert(candidate.dedup_key());
    }
}

/// A candidate together with what happened to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedPattern {
    pub candidate: CandidatePattern,
    pub resolution: Resolution,
}

impl LearningEngine {
    /// Resolve a pass of candidates in order
    pub async fn resolve_all(&self, candidates: Vec<CandidatePattern>) -> Vec<ResolvedPattern> {
        let mut pass = ExtractionPass::new();
        let mut resolved = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let resolution = self.resolve(&candidate, &mut pass).await;
            resolved.push(ResolvedPattern {
                candidate,
                resolution,
            });
        }
        resolved
    }

    /// Insert, reinforce or discard one candidate
    pub async fn resolve(
        &self,
        candidate: &CandidatePattern,
        pass: &mut ExtractionPass,
    ) -> Resolution {
        if pass.contains(candidate) {
            debug!(description = %candidate.description, "Duplicate within pass");
            self.stats.write().await.discarded_in_pass += 1;
            return Resolution::Discarded(DiscardReason::DuplicateInPass);
        }

        let resolution = match self.find_duplicate(candidate).await {
            DuplicateLookup::Found(hit) => self.reinforce(candidate, &hit).await,
            DuplicateLookup::NotFound => self.insert(candidate).await,
            DuplicateLookup::Unavailable(e) => {
                warn!(error = %e, "Duplicate lookup failed, inserting");
                self.record_store_failure().await;
                self.insert(candidate).await
            }
        };

        if !resolution.is_discarded() {
            pass.accept(candidate);
        }
        resolution
    }

    /// Nearest stored pattern in the candidate's category above the merge
    /// threshold
    pub async fn find_duplicate(&self, candidate: &CandidatePattern) -> DuplicateLookup {
        let dedup = &self.config.dedup;
        let query = SearchQuery::new(candidate.text_content.clone(), dedup.top_k)
            .with_category(Some(candidate.category))
            .with_threshold(dedup.merge_threshold);

        let hits = match with_timeout(self.config.timeouts.store, self.service.search(&query)).await
        {
            Ok(hits) => hits,
            Err(e) => return DuplicateLookup::Unavailable(e),
        };

        hits.into_iter()
            .filter(|hit| hit.pattern.category == candidate.category)
            .max_by(|a, b| {
                a.similarity
                    .partial_cmp(&b.similarity)
                    .unwrap_or(Ordering::Equal)
            })
            .filter(|hit| hit.similarity > dedup.merge_threshold)
            .map_or(DuplicateLookup::NotFound, DuplicateLookup::Found)
    }

    async fn reinforce(&self, candidate: &CandidatePattern, hit: &SearchHit) -> Resolution {
        let dedup = &self.config.dedup;
        let id = &hit.pattern.id;
        let note = format!("reinforced by {}: {}", candidate.tool_name, candidate.description);

        match with_timeout(
            self.config.timeouts.store,
            self.service.record_reinforcement(
                id,
                dedup.reinforcement_step,
                dedup.confidence_ceiling,
                &note,
            ),
        )
        .await
        {
            Ok(updated) => {
                info!(
                    pattern_id = %id,
                    similarity = hit.similarity,
                    confidence = updated.confidence.value(),
                    frequency = updated.frequency,
                    "Reinforced pattern"
                );
                self.stats.write().await.reinforced += 1;
                Resolution::Reinforced(id.clone())
            }
            Err(e) => {
                warn!(pattern_id = %id, error = %e, "Reinforcement failed, dropping candidate");
                self.record_store_failure().await;
                Resolution::Discarded(DiscardReason::StoreUnavailable)
            }
        }
    }

    async fn insert(&self, candidate: &CandidatePattern) -> Resolution {
        let call = self.service.store(
            &candidate.text_content,
            candidate.category,
            candidate.confidence.value(),
            candidate.metadata(),
        );

        match with_timeout(self.config.timeouts.store, call).await {
            Ok(id) => {
                info!(
                    pattern_id = %id,
                    pattern_type = candidate.pattern_type.as_str(),
                    category = candidate.category.as_str(),
                    description = %candidate.description,
                    "Stored new pattern"
                );
                self.stats.write().await.inserted += 1;
                Resolution::Inserted(id)
            }
            Err(e) => {
                warn!(error = %e, description = %candidate.description, "Insert failed, dropping candidate");
                self.record_store_failure().await;
                Resolution::Discarded(DiscardReason::StoreUnavailable)
            }
        }
    }
}
