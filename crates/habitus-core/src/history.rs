//! Recent tool invocations and per-project usage tallies
//!
//! Feeds the workflow and project-context extractors. Events without a
//! project path share one anonymous bucket.

use crate::event::{ToolExecutionEvent, ToolKind};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

const SUMMARY_LIMIT: usize = 200;

/// Compact record of one past invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub kind: ToolKind,
    /// Command line, file path, or tool name
    pub summary: String,
    pub program: Option<String>,
    pub file_path: Option<String>,
    pub at: DateTime<Utc>,
}

impl ToolInvocation {
    pub fn from_event(event: &ToolExecutionEvent) -> Self {
        let summary = event
            .command()
            .or_else(|| event.file_path())
            .unwrap_or(&event.tool_name);
        Self {
            tool_name: event.tool_name.clone(),
            kind: event.kind(),
            summary: summary.chars().take(SUMMARY_LIMIT).collect(),
            program: event.program(),
            file_path: event.file_path().map(str::to_string),
            at: event.timestamp,
        }
    }

    pub fn is_edit(&self) -> bool {
        self.kind == ToolKind::Edit
    }
}

#[derive(Debug, Default)]
struct ProjectHistory {
    recent: VecDeque<ToolInvocation>,
    tally: HashMap<String, u32>,
}

/// Bounded per-project invocation buffer
#[derive(Debug)]
pub struct ToolHistory {
    capacity: usize,
    projects: Mutex<HashMap<String, ProjectHistory>>,
}

impl ToolHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            projects: Mutex::new(HashMap::new()),
        }
    }

    /// Record an event; command programs are tallied per project
    pub fn record(&self, event: &ToolExecutionEvent) {
        let key = project_key(event.project());
        let invocation = ToolInvocation::from_event(event);

        let mut projects = self.projects.lock();
        let history = projects.entry(key).or_default();
        if let Some(program) = &invocation.program {
            *history.tally.entry(program.clone()).or_insert(0) += 1;
        }
        history.recent.push_back(invocation);
        while history.recent.len() > self.capacity {
            history.recent.pop_front();
        }
    }

    /// Invocations at or after `since`, oldest first
    pub fn recent(&self, project: Option<&str>, since: DateTime<Utc>) -> Vec<ToolInvocation> {
        let projects = self.projects.lock();
        projects
            .get(&project_key(project))
            .map(|h| h.recent.iter().filter(|i| i.at >= since).cloned().collect())
            .unwrap_or_default()
    }

    /// Program usage counts for a project
    pub fn tally(&self, project: Option<&str>) -> HashMap<String, u32> {
        let projects = self.projects.lock();
        projects
            .get(&project_key(project))
            .map(|h| h.tally.clone())
            .unwrap_or_default()
    }

    pub fn clear(&self) {
        self.projects.lock().clear();
    }
}

impl Default for ToolHistory {
    fn default() -> Self {
        Self::new(50)
    }
}

fn project_key(project: Option<&str>) -> String {
    project.map(str::trim).unwrap_or_default().to_string()
}
