//! External collaborators
//!
//! The similarity service holds stored patterns and answers nearest
//! neighbour queries; the audit store keeps raw events. Both are reached
//! through async traits so deployments can plug in their own backends.
//! The in-memory implementations here back tests and local runs.

mod audit;
mod in_memory;
mod similarity;
#[cfg(test)]
mod tests;
#[allow(clippy::module_inception)]
mod r#trait;

pub use audit::{AuditRecord, InMemoryAuditStore};
pub use in_memory::{InMemorySimilarityService, ReinforcementRecord};
pub use r#trait::{AuditStore, SearchHit, SearchQuery, SimilarityService, StoreStats};
pub use similarity::{dice_similarity, tokens};

#[cfg(test)]
pub use r#trait::{MockAuditStore, MockSimilarityService};

use crate::error::StoreError;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

/// Bound an external call; running out of time becomes [`StoreError::Timeout`]
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(StoreError::Timeout(limit)),
    }
}
