//! Significance gate
//!
//! Cheap, deterministic estimate of how likely an event is to carry
//! learnable signal. Most tool executions are routine; extraction triggers
//! similarity queries, so it is reserved for events that clear the higher
//! of the two thresholds.

use crate::config::SignificanceConfig;
use crate::event::{ToolExecutionEvent, ToolKind};
use once_cell::sync::Lazy;
use regex::Regex;

/// Explicit two-sided corrections and stated preferences
static EXPLICIT_CORRECTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?x)
        \bactually\b[\s,]+(?:use|do|need|should|prefer)\b
        | \buse\s+\S+\s+(?:not|instead\s+of)\s+\S+
        | \bprefer\s+\S+\s+(?:over|to)\s+\S+
        | \b(?:switch|change)\s+(?:to|from)\s+\S+\s+(?:from|to)\s+\S+
        | \b(?:always|never)\s+use\s+\S+
        | \bdon'?t\s+use\s+\S+",
    )
    .expect("explicit correction regex is valid")
});

const PREFERENCE_KEYWORDS: &[&str] = &[
    "actually", "instead", "prefer", "should", "always", "never", "switch", "avoid",
];
const FAILURE_KEYWORDS: &[&str] = &["error", "fail", "exception", "traceback", "denied"];
const ACTION_KEYWORDS: &[&str] = &["install", "upgrade", "uninstall", "test", "commit", "build"];

/// How the score of one event was made up
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SignificanceBreakdown {
    pub tool: f32,
    pub outcome: f32,
    pub correction: f32,
    pub keywords: f32,
    pub length: f32,
}

impl SignificanceBreakdown {
    pub fn total(&self) -> f32 {
        (self.tool + self.outcome + self.correction + self.keywords + self.length).clamp(0.0, 1.0)
    }
}

/// Which side of the two thresholds a score falls on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Not worth logging
    Drop,
    /// Logged, no extraction
    LogOnly,
    /// Logged and analyzed
    Extract,
}

/// Rule-weighted significance scorer
#[derive(Debug, Clone)]
pub struct SignificanceScorer {
    config: SignificanceConfig,
}

impl SignificanceScorer {
    pub fn new(config: SignificanceConfig) -> Self {
        Self { config }
    }

    /// Score an event in [0, 1]
    pub fn score(&self, event: &ToolExecutionEvent) -> f32 {
        match event.normalized_text() {
            Ok(text) => self.breakdown(event, &text).total(),
            Err(_) => 0.0,
        }
    }

    /// Score with an already-normalized text
    pub fn score_text(&self, event: &ToolExecutionEvent, normalized: &str) -> f32 {
        self.breakdown(event, normalized).total()
    }

    pub fn breakdown(&self, event: &ToolExecutionEvent, normalized: &str) -> SignificanceBreakdown {
        let tool = match event.kind() {
            ToolKind::Command | ToolKind::Edit => 0.3,
            ToolKind::Other => 0.1,
            ToolKind::PassiveRead => 0.0,
        };

        let outcome = if event.result_text().trim().is_empty() {
            0.0
        } else {
            0.1
        };

        let correction = if EXPLICIT_CORRECTION.is_match(normalized) {
            0.6
        } else {
            0.0
        };

        // Explicit corrections already carry the preference keywords
        let mut keywords = 0.0;
        if correction == 0.0 && contains_any(normalized, PREFERENCE_KEYWORDS) {
            keywords += 0.2;
        }
        if contains_any(normalized, FAILURE_KEYWORDS) {
            keywords += 0.2;
        }
        if contains_any(normalized, ACTION_KEYWORDS) {
            keywords += 0.1;
        }

        let length = match normalized.len() {
            0..=100 => 0.0,
            101..=400 => 0.05,
            _ => 0.1,
        };

        SignificanceBreakdown {
            tool,
            outcome,
            correction,
            keywords,
            length,
        }
    }

    pub fn gate(&self, score: f32) -> Gate {
        if score >= self.config.extraction_threshold {
            Gate::Extract
        } else if score >= self.config.log_threshold {
            Gate::LogOnly
        } else {
            Gate::Drop
        }
    }

    pub fn config(&self) -> &SignificanceConfig {
        &self.config
    }
}

impl Default for SignificanceScorer {
    fn default() -> Self {
        Self::new(SignificanceConfig::default())
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(kw))
}
