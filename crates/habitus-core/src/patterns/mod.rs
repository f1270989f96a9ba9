//! Pattern extractors
//!
//! Four independent detectors run over the same event:
//! - correction: explicit and stated preferences in the text
//! - tool_preference: package managers the agent actually invoked
//! - workflow: fixed sequences across recent invocations
//! - context: tools used repeatedly in one project
//!
//! They always run in that order so that duplicate suppression during
//! resolution is deterministic. Every description passes through
//! [`sanitize`] before a candidate is emitted.

pub mod context;
pub mod correction;
pub mod sanitize;
pub mod tool_preference;
pub mod workflow;

#[cfg(test)]
mod tests;

pub use correction::CorrectionForm;
pub use sanitize::sanitize;

use crate::config::ExtractionConfig;
use crate::event::ToolExecutionEvent;
use crate::history::ToolInvocation;
use crate::types::{CandidatePattern, Category, PatternContext, PatternType};
use std::collections::HashMap;
use tracing::debug;

/// Raw detector output, before sanitization
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub pattern_type: PatternType,
    pub category: Category,
    pub description: String,
    pub text_content: String,
    pub confidence: f32,
    pub context: PatternContext,
}

/// Everything the extractors look at for one event
#[derive(Debug, Clone, Copy)]
pub struct ExtractionInput<'a> {
    pub event: &'a ToolExecutionEvent,
    /// Output of the normalizer for `event`
    pub normalized: &'a str,
    /// Recent invocations in the same project, oldest first
    pub recent: &'a [ToolInvocation],
    /// Program usage counts for the event's project
    pub usage: &'a HashMap<String, u32>,
}

/// Candidates from one extraction pass
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    /// In extractor order
    pub candidates: Vec<CandidatePattern>,
    /// Detections dropped by the sanitizer
    pub rejected: usize,
}

/// Runs the detectors in fixed order and sanitizes their output
#[derive(Debug, Clone, Default)]
pub struct PatternExtractor {
    config: ExtractionConfig,
}

impl PatternExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn extract(&self, input: &ExtractionInput<'_>) -> Extraction {
        let event = input.event;
        let detections = correction::detect(input.normalized, event)
            .into_iter()
            .chain(tool_preference::detect(event))
            .chain(workflow::detect(event, input.recent))
            .chain(context::detect(
                event,
                input.usage,
                self.config.context_usage_floor,
            ));

        let mut extraction = Extraction::default();
        for detection in detections {
            match self.finish(detection, event) {
                Some(candidate) => extraction.candidates.push(candidate),
                None => extraction.rejected += 1,
            }
        }

        debug!(
            tool = %event.tool_name,
            candidates = extraction.candidates.len(),
            rejected = extraction.rejected,
            "Extraction pass complete"
        );
        extraction
    }

    fn finish(&self, detection: Detection, event: &ToolExecutionEvent) -> Option<CandidatePattern> {
        let max_len = self.config.max_description_len;
        let sanitized = sanitize(&detection.description, max_len).and_then(|description| {
            let text_content = sanitize(&detection.text_content, max_len * 2)?;
            Ok((description, text_content))
        });

        let (description, text_content) = match sanitized {
            Ok(parts) => parts,
            Err(e) => {
                debug!(
                    pattern_type = detection.pattern_type.as_str(),
                    error = %e,
                    "Dropping candidate"
                );
                return None;
            }
        };

        let candidate = CandidatePattern::new(
            detection.pattern_type,
            detection.category,
            description,
            text_content,
            detection.confidence,
            event.tool_name.clone(),
        )
        .with_context(detection.context)
        .with_project_path(event.project().map(str::to_string));

        candidate.is_valid().then_some(candidate)
    }
}
