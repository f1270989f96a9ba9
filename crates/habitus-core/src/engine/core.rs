//! Engine struct, counters and statistics

use crate::config::LearningConfig;
use crate::store::{SimilarityService, StoreStats, with_timeout};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

/// Shared learning engine
pub type SharedLearningEngine = Arc<LearningEngine>;

/// In-process counters since the engine was created
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    /// New stored patterns created
    pub inserted: u64,
    /// Existing patterns reinforced
    pub reinforced: u64,
    /// Candidates dropped as duplicates within one pass
    pub discarded_in_pass: u64,
    /// Failed or timed-out similarity service calls
    pub store_failures: u64,
}

/// Engine counters alongside the service's own totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternStatistics {
    pub engine: EngineStats,
    /// `None` when the service could not be reached
    pub store: Option<StoreStats>,
}

/// Deduplicates candidates against the similarity service and serves
/// read-side queries over it
pub struct LearningEngine {
    pub(super) config: LearningConfig,
    pub(super) service: Arc<dyn SimilarityService>,
    pub(super) stats: RwLock<EngineStats>,
}

impl std::fmt::Debug for LearningEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LearningEngine")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl LearningEngine {
    pub fn new(config: LearningConfig, service: Arc<dyn SimilarityService>) -> Self {
        Self {
            config,
            service,
            stats: RwLock::new(EngineStats::default()),
        }
    }

    pub fn config(&self) -> &LearningConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<dyn SimilarityService> {
        &self.service
    }

    pub async fn stats(&self) -> EngineStats {
        self.stats.read().await.clone()
    }

    /// Engine counters plus the service's totals
    pub async fn pattern_statistics(&self) -> PatternStatistics {
        let store = match with_timeout(self.config.timeouts.store, self.service.stats()).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                warn!(error = %e, "Similarity service stats unavailable");
                self.record_store_failure().await;
                None
            }
        };

        PatternStatistics {
            engine: self.stats().await,
            store,
        }
    }

    pub(super) async fn record_store_failure(&self) {
        self.stats.write().await.store_failures += 1;
    }
}

/// Create a shared engine
pub fn create_learning_engine(
    config: LearningConfig,
    service: Arc<dyn SimilarityService>,
) -> SharedLearningEngine {
    Arc::new(LearningEngine::new(config, service))
}
