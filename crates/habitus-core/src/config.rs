//! Configuration for the capture pipeline
//!
//! Defaults match the behavior described in the crate docs. A config can be
//! loaded from a TOML file and then overridden with `HABITUS_*` environment
//! variables:
//!
//! ```toml
//! background_audit = true
//!
//! [rate_limit]
//! max_events = 100
//! window = "60s"
//!
//! [dedup]
//! merge_threshold = 0.9
//! confidence_ceiling = 0.95
//! ```

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Longest lookback a workflow sequence may span
pub const MAX_WORKFLOW_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Sliding-window throttle settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Calls allowed per window
    pub max_events: usize,
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_events: 100,
            window: Duration::from_secs(60),
        }
    }
}

/// Two-tier significance gate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignificanceConfig {
    /// Below this the event is neither audited nor analyzed
    pub log_threshold: f32,
    /// Below this no pattern extraction is attempted
    pub extraction_threshold: f32,
}

impl Default for SignificanceConfig {
    fn default() -> Self {
        Self {
            log_threshold: 0.3,
            extraction_threshold: 0.6,
        }
    }
}

/// Insert-vs-reinforce decision settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DedupConfig {
    /// Similarity a neighbor must exceed before it is reinforced instead
    /// of inserting a new pattern
    pub merge_threshold: f32,
    /// Similarity at which a text counts as already known
    pub known_threshold: f32,
    /// Neighbors requested per duplicate lookup
    pub top_k: usize,
    pub reinforcement_step: f32,
    pub confidence_ceiling: f32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            merge_threshold: 0.9,
            known_threshold: 0.8,
            top_k: 3,
            reinforcement_step: 0.1,
            confidence_ceiling: 1.0,
        }
    }
}

/// Defaults for read-side queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub min_confidence: f32,
    pub top_k: usize,
    /// Neighbors fetched before filtering a preference listing
    pub preferences_top_k: usize,
    /// Similarity floor for retrieval searches
    pub min_similarity: f32,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.7,
            top_k: 10,
            preferences_top_k: 50,
            min_similarity: 0.1,
        }
    }
}

/// Extractor tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub max_description_len: usize,
    /// Uses of a program in a project before a context pattern is emitted
    pub context_usage_floor: u32,
    /// How far back workflow sequences look
    #[serde(with = "humantime_serde")]
    pub workflow_window: Duration,
    /// Recent invocations kept per project
    pub history_capacity: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_description_len: 200,
            context_usage_floor: 3,
            workflow_window: Duration::from_secs(300),
            history_capacity: 50,
        }
    }
}

/// Bounds on every external call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    #[serde(with = "humantime_serde")]
    pub store: Duration,
    #[serde(with = "humantime_serde")]
    pub audit: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            store: Duration::from_secs(5),
            audit: Duration::from_secs(2),
        }
    }
}

/// Configuration for preference learning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    /// Whether capture is enabled at all
    pub enabled: bool,
    /// Run audit appends on a spawned task instead of awaiting them
    pub background_audit: bool,
    pub rate_limit: RateLimitConfig,
    pub significance: SignificanceConfig,
    pub dedup: DedupConfig,
    pub retrieval: RetrievalConfig,
    pub extraction: ExtractionConfig,
    pub timeouts: TimeoutConfig,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            background_audit: true,
            rate_limit: RateLimitConfig::default(),
            significance: SignificanceConfig::default(),
            dedup: DedupConfig::default(),
            retrieval: RetrievalConfig::default(),
            extraction: ExtractionConfig::default(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl LearningConfig {
    /// Create a disabled configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Load from a TOML file, apply environment overrides, validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file; missing keys keep their defaults
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Apply `HABITUS_*` overrides from the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("HABITUS_ENABLED") {
            self.enabled = parse_var("HABITUS_ENABLED", &v)?;
        }
        if let Some(v) = lookup("HABITUS_BACKGROUND_AUDIT") {
            self.background_audit = parse_var("HABITUS_BACKGROUND_AUDIT", &v)?;
        }
        if let Some(v) = lookup("HABITUS_RATE_LIMIT_MAX_EVENTS") {
            self.rate_limit.max_events = parse_var("HABITUS_RATE_LIMIT_MAX_EVENTS", &v)?;
        }
        if let Some(v) = lookup("HABITUS_RATE_LIMIT_WINDOW_SECS") {
            self.rate_limit.window =
                Duration::from_secs(parse_var("HABITUS_RATE_LIMIT_WINDOW_SECS", &v)?);
        }
        if let Some(v) = lookup("HABITUS_LOG_THRESHOLD") {
            self.significance.log_threshold = parse_var("HABITUS_LOG_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("HABITUS_EXTRACTION_THRESHOLD") {
            self.significance.extraction_threshold =
                parse_var("HABITUS_EXTRACTION_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("HABITUS_MERGE_THRESHOLD") {
            self.dedup.merge_threshold = parse_var("HABITUS_MERGE_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("HABITUS_KNOWN_THRESHOLD") {
            self.dedup.known_threshold = parse_var("HABITUS_KNOWN_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("HABITUS_CONFIDENCE_CEILING") {
            self.dedup.confidence_ceiling = parse_var("HABITUS_CONFIDENCE_CEILING", &v)?;
        }
        if let Some(v) = lookup("HABITUS_STORE_TIMEOUT_MS") {
            self.timeouts.store = Duration::from_millis(parse_var("HABITUS_STORE_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = lookup("HABITUS_AUDIT_TIMEOUT_MS") {
            self.timeouts.audit = Duration::from_millis(parse_var("HABITUS_AUDIT_TIMEOUT_MS", &v)?);
        }
        Ok(())
    }

    /// Reject settings the pipeline cannot honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        let unit = [
            ("significance.log_threshold", self.significance.log_threshold),
            (
                "significance.extraction_threshold",
                self.significance.extraction_threshold,
            ),
            ("dedup.merge_threshold", self.dedup.merge_threshold),
            ("dedup.known_threshold", self.dedup.known_threshold),
            ("dedup.reinforcement_step", self.dedup.reinforcement_step),
            ("dedup.confidence_ceiling", self.dedup.confidence_ceiling),
            ("retrieval.min_confidence", self.retrieval.min_confidence),
            ("retrieval.min_similarity", self.retrieval.min_similarity),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be within 0.0-1.0, got {}",
                    name, value
                )));
            }
        }

        if self.significance.log_threshold > self.significance.extraction_threshold {
            return Err(ConfigError::Invalid(
                "significance.log_threshold exceeds extraction_threshold".to_string(),
            ));
        }
        if self.rate_limit.max_events == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_events must be at least 1".to_string(),
            ));
        }
        if self.dedup.top_k == 0 || self.retrieval.top_k == 0 || self.retrieval.preferences_top_k == 0
        {
            return Err(ConfigError::Invalid("top_k values must be at least 1".to_string()));
        }
        if self.extraction.workflow_window > MAX_WORKFLOW_WINDOW {
            return Err(ConfigError::Invalid(format!(
                "extraction.workflow_window must be at most {}s",
                MAX_WORKFLOW_WINDOW.as_secs()
            )));
        }
        if self.extraction.max_description_len == 0 {
            return Err(ConfigError::Invalid(
                "extraction.max_description_len must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Invalid(format!("Invalid {} value: {}", key, value)))
}
