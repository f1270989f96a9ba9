//! Error types for the capture pipeline and its external collaborators

use crate::types::PatternId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised inside the capture pipeline.
///
/// None of these escape [`CaptureHook::process`](crate::hook::CaptureHook::process).
/// The soft rejections are reported as a [`RejectReason`] on the result,
/// the rest are logged and counted.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("Malformed event: {0}")]
    MalformedEvent(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Significance {score:.2} below threshold {threshold:.2}")]
    LowSignificance { score: f32, threshold: f32 },

    #[error("External store unavailable: {0}")]
    ExternalStoreUnavailable(#[from] StoreError),

    #[error("Sanitization rejected description: {0:?}")]
    SanitizationRejected(String),

    #[error("Capture is disabled")]
    Disabled,
}

impl CaptureError {
    /// Machine-readable reason for the soft rejections that end a call early
    pub fn reason(&self) -> Option<RejectReason> {
        match self {
            Self::MalformedEvent(_) => Some(RejectReason::MalformedEvent),
            Self::RateLimited => Some(RejectReason::RateLimited),
            Self::LowSignificance { .. } => Some(RejectReason::LowSignificance),
            Self::Disabled => Some(RejectReason::Disabled),
            Self::ExternalStoreUnavailable(_) | Self::SanitizationRejected(_) => None,
        }
    }
}

/// Why an event was not captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RejectReason {
    MalformedEvent,
    RateLimited,
    LowSignificance,
    /// Capture is switched off in the configuration
    Disabled,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MalformedEvent => "MalformedEvent",
            Self::RateLimited => "RateLimited",
            Self::LowSignificance => "LowSignificance",
            Self::Disabled => "Disabled",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure talking to the similarity service or the audit store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Pattern not found: {0}")]
    NotFound(PatternId),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
