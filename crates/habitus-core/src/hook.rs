//! Capture hook
//!
//! The single entry point the host calls once per tool execution. It runs
//! rate limiting, significance gating, auditing, extraction and resolution
//! in order and always hands back a [`CaptureResult`]; nothing here returns
//! an error or panics into the caller's tool path.

use crate::config::LearningConfig;
use crate::engine::{EngineStats, Resolution, ResolvedPattern, SharedLearningEngine};
use crate::error::{CaptureError, RejectReason};
use crate::event::ToolExecutionEvent;
use crate::history::ToolHistory;
use crate::patterns::{ExtractionInput, PatternExtractor};
use crate::rate_limiter::{Clock, RateLimiter};
use crate::significance::{Gate, SignificanceScorer};
use crate::store::{AuditStore, with_timeout};
use crate::types::CandidatePattern;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// A pattern this call inserted or reinforced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedPattern {
    pub pattern: CandidatePattern,
    pub resolution: Resolution,
}

/// Outcome of one `process` call
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CaptureResult {
    /// Whether the event went through extraction
    pub accepted: bool,
    /// Why it did not, for soft rejections
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub significance: Option<f32>,
    pub patterns: Vec<CapturedPattern>,
    /// Candidates discarded or lost to store failures
    pub dropped: usize,
}

impl CaptureResult {
    fn rejected(error: &CaptureError) -> Self {
        let significance = match error {
            CaptureError::LowSignificance { score, .. } => Some(*score),
            _ => None,
        };
        Self {
            accepted: false,
            reason: error.reason(),
            significance,
            ..Self::default()
        }
    }

    pub fn inserted(&self) -> usize {
        self.patterns
            .iter()
            .filter(|p| p.resolution.is_inserted())
            .count()
    }

    pub fn reinforced(&self) -> usize {
        self.patterns
            .iter()
            .filter(|p| p.resolution.is_reinforced())
            .count()
    }
}

/// Hook-level counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookStats {
    pub processed: u64,
    pub accepted: u64,
    pub rate_limited: u64,
    pub low_significance: u64,
    pub malformed: u64,
    pub sanitization_rejected: u64,
    pub audit_failures: u64,
}

/// Hook and engine counters together
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureStats {
    pub hook: HookStats,
    pub engine: EngineStats,
}

/// Sequences the capture pipeline for each tool execution
pub struct CaptureHook {
    config: LearningConfig,
    limiter: RateLimiter,
    scorer: SignificanceScorer,
    extractor: PatternExtractor,
    history: Arc<ToolHistory>,
    engine: SharedLearningEngine,
    audit: Option<Arc<dyn AuditStore>>,
    stats: Arc<Mutex<HookStats>>,
}

impl std::fmt::Debug for CaptureHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureHook")
            .field("config", &self.config)
            .field("limiter", &self.limiter)
            .field("audit", &self.audit.is_some())
            .finish_non_exhaustive()
    }
}

impl CaptureHook {
    pub fn new(config: LearningConfig, engine: SharedLearningEngine) -> Self {
        Self {
            limiter: RateLimiter::new(&config.rate_limit),
            scorer: SignificanceScorer::new(config.significance.clone()),
            extractor: PatternExtractor::new(config.extraction.clone()),
            history: Arc::new(ToolHistory::new(config.extraction.history_capacity)),
            engine,
            audit: None,
            stats: Arc::new(Mutex::new(HookStats::default())),
            config,
        }
    }

    pub fn with_audit_store(mut self, audit: Arc<dyn AuditStore>) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Drive the rate limiter from another clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.limiter = RateLimiter::with_clock(&self.config.rate_limit, clock);
        self
    }

    /// Share a history buffer with other hooks
    pub fn with_history(mut self, history: Arc<ToolHistory>) -> Self {
        self.history = history;
        self
    }

    pub fn engine(&self) -> &SharedLearningEngine {
        &self.engine
    }

    pub fn history(&self) -> &Arc<ToolHistory> {
        &self.history
    }

    pub async fn stats(&self) -> CaptureStats {
        let hook = self.stats.lock().clone();
        CaptureStats {
            hook,
            engine: self.engine.stats().await,
        }
    }

    /// Process a raw host payload (`tool`, `args`, `result`, `projectPath`)
    pub async fn process_json(&self, payload: serde_json::Value) -> CaptureResult {
        match serde_json::from_value::<ToolExecutionEvent>(payload) {
            Ok(event) => self.process(event).await,
            Err(e) => {
                let mut stats = self.stats.lock();
                stats.processed += 1;
                stats.malformed += 1;
                drop(stats);
                debug!(error = %e, "Unreadable tool payload");
                CaptureResult::rejected(&CaptureError::MalformedEvent(e.to_string()))
            }
        }
    }

    /// Run one event through the pipeline
    pub async fn process(&self, event: ToolExecutionEvent) -> CaptureResult {
        self.stats.lock().processed += 1;

        if !self.config.enabled {
            return CaptureResult::rejected(&CaptureError::Disabled);
        }

        match self.capture(event).await {
            Ok(result) => {
                self.stats.lock().accepted += 1;
                result
            }
            Err(rejection) => {
                let mut stats = self.stats.lock();
                match rejection.reason() {
                    Some(RejectReason::MalformedEvent) => stats.malformed += 1,
                    Some(RejectReason::RateLimited) => stats.rate_limited += 1,
                    Some(RejectReason::LowSignificance) => stats.low_significance += 1,
                    Some(RejectReason::Disabled) | None => {}
                }
                CaptureResult::rejected(&rejection)
            }
        }
    }

    async fn capture(&self, event: ToolExecutionEvent) -> Result<CaptureResult, CaptureError> {
        event.validate()?;

        if !self.limiter.allow() {
            debug!(tool = %event.tool_name, "Rate limited");
            return Err(CaptureError::RateLimited);
        }

        let project = event.project().map(str::to_string);
        let since = workflow_start(event.timestamp, self.config.extraction.workflow_window);
        let recent = self.history.recent(project.as_deref(), since);
        self.history.record(&event);
        let usage = self.history.tally(project.as_deref());

        let normalized = event.normalized_text()?;
        let score = self.scorer.score_text(&event, &normalized);
        let gate = self.scorer.gate(score);

        if gate == Gate::Drop {
            debug!(tool = %event.tool_name, score, "Below logging threshold");
            return Err(CaptureError::LowSignificance {
                score,
                threshold: self.config.significance.log_threshold,
            });
        }

        self.audit(&event, score).await;

        if gate == Gate::LogOnly {
            debug!(tool = %event.tool_name, score, "Logged without extraction");
            return Err(CaptureError::LowSignificance {
                score,
                threshold: self.config.significance.extraction_threshold,
            });
        }

        let extraction = self.extractor.extract(&ExtractionInput {
            event: &event,
            normalized: &normalized,
            recent: &recent,
            usage: &usage,
        });
        if extraction.rejected > 0 {
            self.stats.lock().sanitization_rejected += extraction.rejected as u64;
        }

        let resolved = self.engine.resolve_all(extraction.candidates).await;
        let mut result = CaptureResult {
            accepted: true,
            significance: Some(score),
            dropped: extraction.rejected,
            ..CaptureResult::default()
        };
        for ResolvedPattern {
            candidate,
            resolution,
        } in resolved
        {
            if resolution.is_discarded() {
                result.dropped += 1;
            } else {
                result.patterns.push(CapturedPattern {
                    pattern: candidate,
                    resolution,
                });
            }
        }

        info!(
            tool = %event.tool_name,
            score,
            inserted = result.inserted(),
            reinforced = result.reinforced(),
            dropped = result.dropped,
            "Captured event"
        );
        Ok(result)
    }

    async fn audit(&self, event: &ToolExecutionEvent, significance: f32) {
        let Some(store) = self.audit.clone() else {
            return;
        };
        let limit = self.config.timeouts.audit;

        if self.config.background_audit {
            let event = event.clone();
            let stats = self.stats.clone();
            tokio::spawn(async move {
                if !append_with_retry(store.as_ref(), &event, significance, limit).await {
                    stats.lock().audit_failures += 1;
                }
            });
        } else if !append_with_retry(store.as_ref(), event, significance, limit).await {
            self.stats.lock().audit_failures += 1;
        }
    }
}

/// Earliest timestamp a workflow predecessor may have; saturates instead of
/// overflowing for very long windows
fn workflow_start(at: DateTime<Utc>, window: Duration) -> DateTime<Utc> {
    ChronoDuration::from_std(window)
        .ok()
        .and_then(|window| at.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Append once, retry once; `false` when both attempts failed
async fn append_with_retry(
    store: &dyn AuditStore,
    event: &ToolExecutionEvent,
    significance: f32,
    limit: Duration,
) -> bool {
    for attempt in 1..=2 {
        match with_timeout(limit, store.append(event, significance)).await {
            Ok(()) => return true,
            Err(e) => warn!(attempt, error = %e, tool = %event.tool_name, "Audit append failed"),
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::create_learning_engine;
    use crate::error::StoreError;
    use crate::rate_limiter::ManualClock;
    use crate::store::{InMemoryAuditStore, InMemorySimilarityService, MockAuditStore};
    use serde_json::json;

    fn hook(config: LearningConfig) -> CaptureHook {
        let engine = create_learning_engine(
            config.clone(),
            Arc::new(InMemorySimilarityService::new()),
        );
        CaptureHook::new(config, engine)
    }

    fn foreground() -> LearningConfig {
        LearningConfig {
            background_audit: false,
            ..LearningConfig::default()
        }
    }

    fn correction_event() -> ToolExecutionEvent {
        ToolExecutionEvent::new("Bash")
            .with_arg("command", "pip install requests")
            .with_result("Actually, use uv not pip")
    }

    #[tokio::test]
    async fn test_malformed_event() {
        let hook = hook(LearningConfig::default());
        let result = hook.process(ToolExecutionEvent::new("  ")).await;
        assert!(!result.accepted);
        assert_eq!(result.reason, Some(RejectReason::MalformedEvent));

        let result = hook.process_json(json!({"args": {}})).await;
        assert_eq!(result.reason, Some(RejectReason::MalformedEvent));

        let stats = hook.stats().await.hook;
        assert_eq!(stats.malformed, 2);
        assert_eq!(stats.processed, 2);
    }

    #[tokio::test]
    async fn test_low_significance_is_not_audited() {
        let audit = InMemoryAuditStore::new();
        let hook = hook(foreground()).with_audit_store(Arc::new(audit.clone()));

        let event = ToolExecutionEvent::new("Read")
            .with_arg("file_path", "x.txt")
            .with_result("hello world");
        let result = hook.process(event).await;

        assert!(!result.accepted);
        assert_eq!(result.reason, Some(RejectReason::LowSignificance));
        assert!(result.significance.unwrap() < 0.3);
        assert!(result.patterns.is_empty());
        assert!(audit.is_empty().await);
    }

    #[tokio::test]
    async fn test_log_only_band_is_audited_without_extraction() {
        let audit = InMemoryAuditStore::new();
        let hook = hook(foreground()).with_audit_store(Arc::new(audit.clone()));

        let event = ToolExecutionEvent::new("Bash")
            .with_arg("command", "ls -la")
            .with_result("total 0");
        let result = hook.process(event).await;

        assert!(!result.accepted);
        assert_eq!(result.reason, Some(RejectReason::LowSignificance));
        assert_eq!(audit.len().await, 1);
        assert_eq!(hook.engine().stats().await, EngineStats::default());
    }

    #[tokio::test]
    async fn test_accepted_event() {
        let audit = InMemoryAuditStore::new();
        let hook = hook(foreground()).with_audit_store(Arc::new(audit.clone()));

        let result = hook.process(correction_event()).await;
        assert!(result.accepted);
        assert!(result.reason.is_none());
        assert!(result.significance.unwrap() >= 0.6);
        assert!(result.inserted() >= 1);
        assert_eq!(audit.len().await, 1);

        let stats = hook.stats().await;
        assert_eq!(stats.hook.accepted, 1);
        assert_eq!(stats.engine.inserted as usize, result.inserted());
    }

    #[tokio::test]
    async fn test_rate_limit() {
        let mut config = LearningConfig::default();
        config.rate_limit.max_events = 2;
        let clock = ManualClock::new();
        let hook = hook(config).with_clock(Arc::new(clock.clone()));

        let first = hook.process(correction_event()).await;
        let second = hook.process(correction_event()).await;
        let third = hook.process(correction_event()).await;
        assert!(first.accepted && second.accepted);
        assert_eq!(third.reason, Some(RejectReason::RateLimited));
        assert!(third.patterns.is_empty());

        clock.advance(Duration::from_secs(60));
        assert!(hook.process(correction_event()).await.accepted);
        assert_eq!(hook.stats().await.hook.rate_limited, 1);
    }

    #[tokio::test]
    async fn test_rate_limited_events_leave_history_alone() {
        let mut config = LearningConfig::default();
        config.rate_limit.max_events = 1;
        let hook = hook(config).with_clock(Arc::new(ManualClock::new()));
        let run = || {
            ToolExecutionEvent::new("Bash")
                .with_arg("command", "uv run pytest")
                .with_project_path("/work/api")
        };

        hook.process(run()).await;
        let limited = hook.process(run()).await;
        assert_eq!(limited.reason, Some(RejectReason::RateLimited));
        assert_eq!(hook.history().tally(Some("/work/api")).get("uv"), Some(&1));
    }

    #[tokio::test]
    async fn test_oversized_workflow_window_does_not_panic() {
        let mut config = foreground();
        config.extraction.workflow_window = Duration::from_secs(u64::MAX / 4);
        let hook = hook(config);

        let result = hook.process(correction_event()).await;
        assert!(result.accepted);
        assert!(result.inserted() >= 1);
    }

    #[test]
    fn test_workflow_start_saturates() {
        let now = chrono::Utc::now();
        assert_eq!(
            workflow_start(now, Duration::from_secs(300)),
            now - ChronoDuration::minutes(5)
        );
        assert_eq!(
            workflow_start(now, Duration::from_secs(3_153_600_000_000_000)),
            DateTime::<Utc>::MIN_UTC
        );
        assert_eq!(
            workflow_start(now, Duration::from_secs(u64::MAX)),
            DateTime::<Utc>::MIN_UTC
        );
    }

    #[tokio::test]
    async fn test_audit_failure_is_retried_once_and_never_fatal() {
        let mut audit = MockAuditStore::new();
        audit
            .expect_append()
            .times(2)
            .returning(|_, _| Err(StoreError::unavailable("audit db locked")));

        let hook = hook(foreground()).with_audit_store(Arc::new(audit));
        let result = hook.process(correction_event()).await;

        assert!(result.accepted);
        assert_eq!(hook.stats().await.hook.audit_failures, 1);
    }

    #[tokio::test]
    async fn test_audit_retry_recovers() {
        let mut audit = MockAuditStore::new();
        let mut seq = mockall::Sequence::new();
        audit
            .expect_append()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(StoreError::unavailable("busy")));
        audit
            .expect_append()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(()));

        let hook = hook(foreground()).with_audit_store(Arc::new(audit));
        hook.process(correction_event()).await;
        assert_eq!(hook.stats().await.hook.audit_failures, 0);
    }

    #[tokio::test]
    async fn test_background_audit() {
        let audit = InMemoryAuditStore::new();
        let hook = hook(LearningConfig::default()).with_audit_store(Arc::new(audit.clone()));

        assert!(hook.process(correction_event()).await.accepted);
        for _ in 0..50 {
            if !audit.is_empty().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(audit.len().await, 1);
    }

    #[tokio::test]
    async fn test_disabled_hook_does_nothing() {
        let hook = hook(LearningConfig::disabled());
        let result = hook.process(correction_event()).await;
        assert!(!result.accepted);
        assert_eq!(result.reason, Some(RejectReason::Disabled));
        assert!(result.patterns.is_empty());
        assert_eq!(hook.engine().stats().await, EngineStats::default());
        assert!(hook.history().tally(None).is_empty());
    }

    #[tokio::test]
    async fn test_result_serializes_reason() {
        let hook = hook(LearningConfig::default());
        let result = hook
            .process(ToolExecutionEvent::new("Read").with_arg("file_path", "x.txt"))
            .await;
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["accepted"], json!(false));
        assert_eq!(json["reason"], json!("LowSignificance"));
    }
}
