//! Project-context preference from per-project usage tallies

use super::Detection;
use crate::category;
use crate::event::ToolExecutionEvent;
use crate::types::{PatternContext, PatternType};
use std::collections::HashMap;

/// Confidence reached at ten uses and above
pub const CONTEXT_CONFIDENCE_CAP: f32 = 0.9;

/// Emit a context candidate for the program the current event invoked
/// once its project tally reaches `floor`
pub fn detect(
    event: &ToolExecutionEvent,
    usage: &HashMap<String, u32>,
    floor: u32,
) -> Option<Detection> {
    let project = event.project()?;
    let tool = event.program()?;
    let count = *usage.get(&tool)?;
    if count < floor.max(1) {
        return None;
    }

    let project_name = project
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(project);

    Some(Detection {
        pattern_type: PatternType::Context,
        category: category::classify(&tool, ""),
        description: format!("use {} in this project", tool),
        text_content: format!("context: {} is preferred in project {}", tool, project_name),
        confidence: usage_confidence(count),
        context: PatternContext::new()
            .with_tool(tool)
            .with_usage_count(count)
            .with_extra("project_path", project),
    })
}

/// Scales with use count up to the cap at ten uses
pub fn usage_confidence(count: u32) -> f32 {
    (count as f32 / 10.0).min(CONTEXT_CONFIDENCE_CAP)
}
