//! Task list input (`tasks.jsonl`): one JSON record per line.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::task::task_id;
use crate::core::types::Task;
use crate::error::TaskRecordError;

/// Source of raw task records for the queue.
pub trait TaskSource {
    /// All lines in order, or `None` when the source does not exist.
    fn read_lines(&self) -> Result<Option<Vec<String>>>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// Newline-delimited JSON file of task records.
#[derive(Debug, Clone)]
pub struct JsonlTaskSource {
    path: PathBuf,
}

impl JsonlTaskSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TaskSource for JsonlTaskSource {
    fn read_lines(&self) -> Result<Option<Vec<String>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("read task list {}", self.path.display()))?;
        Ok(Some(contents.lines().map(str::to_string).collect()))
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Debug, Deserialize)]
struct TaskRecord {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    goal: Option<String>,
}

/// Parse one non-blank task line (`line` is 1-based, for reporting).
///
/// The goal is trimmed. A non-empty `id` is used verbatim; otherwise the id is
/// derived from the goal.
pub fn parse_task_record(line: usize, raw: &str) -> Result<Task, TaskRecordError> {
    let record: TaskRecord =
        serde_json::from_str(raw.trim()).map_err(|err| TaskRecordError::Malformed {
            line,
            reason: err.to_string(),
        })?;
    let goal = record.goal.as_deref().map(str::trim).unwrap_or_default();
    if goal.is_empty() {
        return Err(TaskRecordError::MissingGoal { line });
    }
    let id = match record.id {
        Some(id) if !id.is_empty() => id,
        _ => task_id(goal),
    };
    Ok(Task {
        id,
        goal: goal.to_string(),
    })
}
