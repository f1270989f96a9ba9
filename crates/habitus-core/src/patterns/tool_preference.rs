//! Implicit tool preference from package-manager commands

use super::Detection;
use crate::event::{ToolExecutionEvent, ToolKind};
use crate::types::{Category, PatternContext, PatternType};

/// Confidence for usage-only signal; needs reinforcement to matter
pub const TOOL_PREFERENCE_CONFIDENCE: f32 = 0.5;

const INSTALL_VERBS: &[&str] = &["install", "add", "update", "upgrade", "sync"];

const PACKAGE_MANAGERS: &[&str] = &[
    "uv", "pip", "pip3", "pipx", "poetry", "conda", "mamba", "npm", "yarn", "pnpm", "bun",
    "cargo", "gem", "bundle", "brew", "apt", "apt-get", "composer", "go",
];

/// Emit a candidate naming the package manager a command invoked, always
/// filed under package management
pub fn detect(event: &ToolExecutionEvent) -> Option<Detection> {
    if event.kind() != ToolKind::Command {
        return None;
    }
    let command = event.command()?.to_lowercase();
    let verb = command
        .split_whitespace()
        .find(|word| INSTALL_VERBS.contains(word))?
        .to_string();

    let tool = event.program()?;
    if !PACKAGE_MANAGERS.contains(&tool.as_str()) {
        return None;
    }

    let category = Category::PackageManagement;
    Some(Detection {
        pattern_type: PatternType::ToolPreference,
        category,
        description: format!("use {} for {}", tool, category),
        text_content: format!("tool preference: {} for {}", tool, category),
        confidence: TOOL_PREFERENCE_CONFIDENCE,
        context: PatternContext::new()
            .with_tool(tool)
            .with_extra("action", verb)
            .with_extra("command", command.chars().take(200).collect::<String>()),
    })
}
