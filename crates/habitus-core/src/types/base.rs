//! Base value types shared by extraction, storage and retrieval

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier assigned by the similarity service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PatternId(pub String);

impl PatternId {
    /// Create a new random pattern ID
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PatternId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PatternId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of statement a pattern captures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    /// Explicit correction or stated preference ("use X not Y")
    Correction,
    /// Implicit preference from the tool actually invoked
    ToolPreference,
    /// Recurring sequence of tool invocations
    Workflow,
    /// Tool habitually used within one project
    Context,
}

impl PatternType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correction => "correction",
            Self::ToolPreference => "tool_preference",
            Self::Workflow => "workflow",
            Self::Context => "context",
        }
    }

    /// Whether the pattern is an actionable preference surfaced by
    /// preference listings
    pub fn is_preference(&self) -> bool {
        matches!(self, Self::Correction | Self::ToolPreference)
    }
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fixed semantic taxonomy used to scope storage and search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    PackageManagement,
    Testing,
    VersionControl,
    CodeQuality,
    BuildTools,
    Documentation,
    General,
}

impl Category {
    /// Every category, in classification priority order
    pub const ALL: [Category; 7] = [
        Category::PackageManagement,
        Category::Testing,
        Category::VersionControl,
        Category::CodeQuality,
        Category::BuildTools,
        Category::Documentation,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PackageManagement => "package-management",
            Self::Testing => "testing",
            Self::VersionControl => "version-control",
            Self::CodeQuality => "code-quality",
            Self::BuildTools => "build-tools",
            Self::Documentation => "documentation",
            Self::General => "general",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| format!("unknown category: {}", s))
    }
}

/// Confidence in a pattern, always within 0.0-1.0
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Confidence(f32);

impl Confidence {
    /// Create a new confidence value (clamped to 0.0-1.0)
    pub fn new(value: f32) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 1.0))
    }

    pub fn value(&self) -> f32 {
        self.0
    }

    pub fn is_high(&self) -> bool {
        self.0 >= 0.7
    }

    /// Confidence after one reinforcement step.
    ///
    /// Raises by `step` up to `ceiling`; a value already above the ceiling
    /// is kept as is, so the result is never lower than `self`.
    pub fn reinforced(&self, step: f32, ceiling: f32) -> Self {
        let target = (self.0 + step.max(0.0)).min(ceiling.clamp(0.0, 1.0));
        Self::new(target.max(self.0))
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self(0.5)
    }
}

impl From<f32> for Confidence {
    fn from(value: f32) -> Self {
        Self::new(value)
    }
}
