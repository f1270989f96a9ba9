//! Candidate and stored pattern records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::base::{Category, Confidence, PatternId, PatternType};

/// Extraction provenance attached to a pattern.
///
/// The well-known fields cover what the extractors record; anything else
/// goes into `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatternContext {
    /// Term the user wants used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred: Option<String>,
    /// Term the user wants avoided
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avoided: Option<String>,
    /// Program the pattern is about
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    /// Times the tool was seen in the project
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_count: Option<u32>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl PatternContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preferred(mut self, term: impl Into<String>) -> Self {
        self.preferred = Some(term.into());
        self
    }

    pub fn with_avoided(mut self, term: impl Into<String>) -> Self {
        self.avoided = Some(term.into());
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tool = Some(tool.into());
        self
    }

    pub fn with_usage_count(mut self, count: u32) -> Self {
        self.usage_count = Some(count);
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A preference/workflow statement extracted from one event, not yet
/// reconciled against storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidatePattern {
    pub pattern_type: PatternType,
    pub category: Category,
    /// Sanitized, bounded human text
    pub description: String,
    /// Full searchable text used for similarity
    pub text_content: String,
    pub confidence: Confidence,
    pub context: PatternContext,
    pub tool_name: String,
    pub project_path: Option<String>,
}

impl CandidatePattern {
    pub fn new(
        pattern_type: PatternType,
        category: Category,
        description: impl Into<String>,
        text_content: impl Into<String>,
        confidence: f32,
        tool_name: impl Into<String>,
    ) -> Self {
        Self {
            pattern_type,
            category,
            description: description.into(),
            text_content: text_content.into(),
            confidence: Confidence::new(confidence),
            context: PatternContext::default(),
            tool_name: tool_name.into(),
            project_path: None,
        }
    }

    pub fn with_context(mut self, context: PatternContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_project_path(mut self, project_path: Option<String>) -> Self {
        self.project_path = project_path.filter(|p| !p.trim().is_empty());
        self
    }

    /// Whether the candidate satisfies the emit invariants
    pub fn is_valid(&self) -> bool {
        !self.description.trim().is_empty() && !self.text_content.trim().is_empty()
    }

    /// Category plus lowercased description, for same-pass duplicate
    /// suppression
    pub fn dedup_key(&self) -> String {
        format!("{}:{}", self.category, self.description.trim().to_lowercase())
    }

    /// Metadata handed to the similarity service on insert
    pub fn metadata(&self) -> PatternMetadata {
        PatternMetadata {
            pattern_type: self.pattern_type,
            description: self.description.clone(),
            tool_name: self.tool_name.clone(),
            project_path: self.project_path.clone(),
            context: self.context.clone(),
            extracted_at: Utc::now(),
        }
    }
}

/// Provenance stored alongside a pattern in the similarity service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternMetadata {
    pub pattern_type: PatternType,
    pub description: String,
    pub tool_name: String,
    #[serde(default)]
    pub project_path: Option<String>,
    #[serde(default)]
    pub context: PatternContext,
    pub extracted_at: DateTime<Utc>,
}

/// Durable record of a learned pattern, owned by the similarity service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPattern {
    pub id: PatternId,
    pub text_content: String,
    pub category: Category,
    pub confidence: Confidence,
    /// Times observed, at least 1
    pub frequency: u32,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub metadata: PatternMetadata,
}

impl StoredPattern {
    /// Create a first-observation record
    pub fn new(
        id: PatternId,
        text_content: impl Into<String>,
        category: Category,
        confidence: f32,
        metadata: PatternMetadata,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            text_content: text_content.into(),
            category,
            confidence: Confidence::new(confidence),
            frequency: 1,
            first_seen: now,
            last_seen: now,
            metadata,
        }
    }

    pub fn pattern_type(&self) -> PatternType {
        self.metadata.pattern_type
    }

    pub fn description(&self) -> &str {
        &self.metadata.description
    }

    /// Apply one reinforcement: confidence raised by `step` up to
    /// `ceiling` (never lowered), frequency incremented, last-seen refreshed
    pub fn apply_reinforcement(&mut self, step: f32, ceiling: f32) {
        self.confidence = self.confidence.reinforced(step, ceiling);
        self.frequency = self.frequency.saturating_add(1);
        self.last_seen = Utc::now();
    }
}
