//! Tool execution events and the text normalizer

use crate::error::CaptureError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Broad class of a tool, used by the significance gate and the extractors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolKind {
    /// Runs a shell command
    Command,
    /// Changes files
    Edit,
    /// Only reads state
    PassiveRead,
    Other,
}

impl ToolKind {
    pub fn of(tool_name: &str) -> Self {
        let name = tool_name.trim().to_lowercase();
        if name.starts_with("bash") || name == "shell" || name == "exec" {
            return Self::Command;
        }
        match name.as_str() {
            "edit" | "multiedit" | "write" | "notebookedit" => Self::Edit,
            "read" | "glob" | "grep" | "ls" | "webfetch" | "websearch" | "todoread"
            | "notebookread" => Self::PassiveRead,
            _ => Self::Other,
        }
    }

    /// Tools that act on the world rather than observe it
    pub fn is_execution(&self) -> bool {
        matches!(self, Self::Command | Self::Edit)
    }
}

/// One tool invocation reported by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolExecutionEvent {
    #[serde(alias = "tool")]
    pub tool_name: String,
    #[serde(default)]
    pub args: Map<String, Value>,
    #[serde(default)]
    pub result: Value,
    #[serde(default, alias = "projectPath")]
    pub project_path: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl ToolExecutionEvent {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            tool_name: tool_name.into(),
            args: Map::new(),
            result: Value::Null,
            project_path: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.args.insert(key.into(), value.into());
        self
    }

    pub fn with_result(mut self, result: impl Into<Value>) -> Self {
        self.result = result.into();
        self
    }

    pub fn with_project_path(mut self, project_path: impl Into<String>) -> Self {
        self.project_path = Some(project_path.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn kind(&self) -> ToolKind {
        ToolKind::of(&self.tool_name)
    }

    /// Shell command, for command tools
    pub fn command(&self) -> Option<&str> {
        self.args.get("command").and_then(Value::as_str)
    }

    pub fn file_path(&self) -> Option<&str> {
        self.args
            .get("file_path")
            .or_else(|| self.args.get("path"))
            .and_then(Value::as_str)
    }

    /// Project path with blanks treated as absent
    pub fn project(&self) -> Option<&str> {
        self.project_path
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }

    /// Result flattened to text
    pub fn result_text(&self) -> String {
        let mut parts = Vec::new();
        flatten_value(&self.result, &mut parts);
        parts.join(" ")
    }

    /// Program a command tool invoked (`uv` for `sudo uv pip install x`)
    pub fn program(&self) -> Option<String> {
        if self.kind() != ToolKind::Command {
            return None;
        }
        self.command().and_then(command_program)
    }

    /// Normalized search text for this event
    pub fn normalized_text(&self) -> Result<String, CaptureError> {
        normalize(&self.tool_name, &self.args, &self.result)
    }

    /// Reject events that cannot be analyzed at all
    pub fn validate(&self) -> Result<(), CaptureError> {
        if self.tool_name.trim().is_empty() {
            return Err(CaptureError::MalformedEvent(
                "tool identifier is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Flatten an event into one lowercase search string.
///
/// Argument entries contribute `key value`; structured results are walked
/// recursively. Only the tool name is required.
pub fn normalize(
    tool_name: &str,
    args: &Map<String, Value>,
    result: &Value,
) -> Result<String, CaptureError> {
    let tool_name = tool_name.trim();
    if tool_name.is_empty() {
        return Err(CaptureError::MalformedEvent(
            "tool identifier is empty".to_string(),
        ));
    }

    let mut parts = vec![tool_name.to_string()];
    for (key, value) in args {
        parts.push(key.clone());
        flatten_value(value, &mut parts);
    }
    flatten_value(result, &mut parts);

    let joined = parts.join(" ").to_lowercase();
    Ok(joined.split_whitespace().collect::<Vec<_>>().join(" "))
}

fn flatten_value(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push(s.clone()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Number(n) => out.push(n.to_string()),
        Value::Array(items) => {
            for item in items {
                flatten_value(item, out);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                out.push(key.clone());
                flatten_value(item, out);
            }
        }
    }
}

/// First real program word of a shell command
pub fn command_program(command: &str) -> Option<String> {
    command
        .split_whitespace()
        .skip_while(|word| {
            matches!(*word, "sudo" | "env" | "time" | "nohup" | "exec")
                || (word.contains('=') && !word.starts_with('-'))
        })
        .next()
        .map(|word| {
            word.rsplit('/')
                .next()
                .unwrap_or(word)
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_kind() {
        assert_eq!(ToolKind::of("Bash"), ToolKind::Command);
        assert_eq!(ToolKind::of("bash_background"), ToolKind::Command);
        assert_eq!(ToolKind::of("Edit"), ToolKind::Edit);
        assert_eq!(ToolKind::of("Read"), ToolKind::PassiveRead);
        assert_eq!(ToolKind::of("Task"), ToolKind::Other);
        assert!(ToolKind::Edit.is_execution());
        assert!(!ToolKind::PassiveRead.is_execution());
    }

    #[test]
    fn test_normalize_flattens_everything() {
        let event = ToolExecutionEvent::new("Bash")
            .with_arg("command", "PIP install requests")
            .with_result(json!({"stdout": "Actually, use UV", "exit_code": 1}));

        let text = event.normalized_text().unwrap();
        assert_eq!(
            text,
            "bash command pip install requests exit_code 1 stdout actually, use uv"
        );
    }

    #[test]
    fn test_normalize_rejects_missing_tool() {
        let err = normalize("   ", &Map::new(), &Value::Null).unwrap_err();
        assert!(matches!(err, CaptureError::MalformedEvent(_)));
        assert!(ToolExecutionEvent::new("").validate().is_err());
    }

    #[test]
    fn test_normalize_coerces_odd_values() {
        let event = ToolExecutionEvent::new("Custom")
            .with_arg("flags", json!([true, null, 3.5]))
            .with_result(json!(null));
        assert_eq!(event.normalized_text().unwrap(), "custom flags true 3.5");
    }

    #[test]
    fn test_deserialize_host_payload() {
        let event: ToolExecutionEvent = serde_json::from_value(json!({
            "tool": "Bash",
            "args": {"command": "uv add httpx"},
            "result": "Resolved 3 packages",
            "projectPath": "/work/app"
        }))
        .unwrap();

        assert_eq!(event.tool_name, "Bash");
        assert_eq!(event.command(), Some("uv add httpx"));
        assert_eq!(event.project(), Some("/work/app"));
        assert_eq!(event.result_text(), "Resolved 3 packages");
    }

    #[test]
    fn test_command_program() {
        assert_eq!(command_program("uv pip install x"), Some("uv".to_string()));
        assert_eq!(
            command_program("sudo RUST_LOG=debug /usr/bin/cargo test"),
            Some("cargo".to_string())
        );
        assert_eq!(command_program("   "), None);

        let event = ToolExecutionEvent::new("Read").with_arg("command", "uv sync");
        assert_eq!(event.program(), None);
    }
}
