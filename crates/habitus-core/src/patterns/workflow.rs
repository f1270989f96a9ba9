//! Workflow sequences across recent invocations
//!
//! `recent` is the caller-supplied window of invocations in the same
//! project, oldest first, not including the current event.

use super::Detection;
use crate::event::{ToolExecutionEvent, ToolKind};
use crate::history::ToolInvocation;
use crate::types::{Category, PatternContext, PatternType};

const TEST_WORDS: &[&str] = &[
    "test", "tests", "pytest", "unittest", "jest", "vitest", "mocha", "nextest", "spec",
];
const DOC_MARKERS: &[&str] = &["README", "DOC", "GUIDE"];
const SOURCE_MARKERS: &[&str] = &["src", "lib"];

/// One fixed sequence: a current event shape preceded by a recent one
struct WorkflowRule {
    current: fn(&ToolExecutionEvent) -> bool,
    preceded_by: fn(&ToolInvocation) -> bool,
    category: Category,
    description: &'static str,
    text_content: &'static str,
    sequence: &'static str,
    confidence: f32,
}

const RULES: &[WorkflowRule] = &[
    WorkflowRule {
        current: is_test_run,
        preceded_by: ToolInvocation::is_edit,
        category: Category::Testing,
        description: "run tests after code changes",
        text_content: "workflow: run tests after code changes for quality assurance",
        sequence: "code_change,test_execution",
        confidence: 0.7,
    },
    WorkflowRule {
        current: is_doc_edit,
        preceded_by: is_source_edit,
        category: Category::Documentation,
        description: "update documentation after feature changes",
        text_content: "workflow: update documentation after implementing features for maintainability",
        sequence: "feature_development,documentation_update",
        confidence: 0.6,
    },
    WorkflowRule {
        current: is_commit,
        preceded_by: was_test_run,
        category: Category::VersionControl,
        description: "commit after running tests",
        text_content: "workflow: commit changes after running tests",
        sequence: "test_execution,commit",
        confidence: 0.65,
    },
];

/// Match the current event against each fixed sequence
pub fn detect(event: &ToolExecutionEvent, recent: &[ToolInvocation]) -> Vec<Detection> {
    RULES
        .iter()
        .filter(|rule| (rule.current)(event))
        .filter_map(|rule| {
            let earlier: Vec<&ToolInvocation> =
                recent.iter().filter(|inv| (rule.preceded_by)(inv)).collect();
            if earlier.is_empty() {
                return None;
            }

            let tools = earlier
                .iter()
                .map(|inv| inv.tool_name.as_str())
                .chain(std::iter::once(event.tool_name.as_str()))
                .collect::<Vec<_>>()
                .join(",");

            Some(Detection {
                pattern_type: PatternType::Workflow,
                category: rule.category,
                description: rule.description.to_string(),
                text_content: rule.text_content.to_string(),
                confidence: rule.confidence,
                context: PatternContext::new()
                    .with_tool(event.tool_name.clone())
                    .with_extra("sequence", rule.sequence)
                    .with_extra("tools", tools),
            })
        })
        .collect()
}

fn mentions_tests(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| TEST_WORDS.contains(&word))
}

fn is_test_run(event: &ToolExecutionEvent) -> bool {
    event.kind() == ToolKind::Command && event.command().is_some_and(mentions_tests)
}

fn was_test_run(invocation: &ToolInvocation) -> bool {
    invocation.kind == ToolKind::Command && mentions_tests(&invocation.summary)
}

fn is_doc_edit(event: &ToolExecutionEvent) -> bool {
    event.kind() == ToolKind::Edit
        && event.file_path().is_some_and(|path| {
            let file_name = path.rsplit('/').next().unwrap_or(path).to_uppercase();
            DOC_MARKERS.iter().any(|marker| file_name.contains(marker))
        })
}

fn is_source_edit(invocation: &ToolInvocation) -> bool {
    invocation.is_edit()
        && invocation
            .file_path
            .as_deref()
            .is_some_and(|path| path.split('/').any(|segment| SOURCE_MARKERS.contains(&segment)))
}

fn is_commit(event: &ToolExecutionEvent) -> bool {
    event.program().as_deref() == Some("git")
        && event
            .command()
            .is_some_and(|c| c.split_whitespace().any(|w| w == "commit"))
}
