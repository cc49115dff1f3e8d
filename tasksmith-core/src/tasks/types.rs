//! Task data model
//!
//! These types mirror the on-disk task file and the JSON the providers are
//! asked to produce. Field names are camelCase on the wire.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Task identifier, unique within a task set
pub type TaskId = u32;

/// Lifecycle status of a task or subtask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Done,
}

impl TaskStatus {
    /// Wire name of the status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "in-progress" | "in_progress" => Ok(Self::InProgress),
            "done" => Ok(Self::Done),
            other => Err(format!(
                "unknown status '{}', expected pending, in-progress or done",
                other
            )),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Higher rank means more urgent
    pub fn rank(&self) -> u8 {
        match self {
            Self::High => 2,
            Self::Medium => 1,
            Self::Low => 0,
        }
    }

    /// Wire name of the priority
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A unit of work inside a task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    /// Identifier local to the parent task, starting at 1
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    /// Ids of sibling subtasks this one depends on
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    #[serde(default)]
    pub details: String,
}

/// A generated or stored task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    /// Ids of tasks that must be done first
    #[serde(default)]
    pub dependencies: Vec<TaskId>,
    #[serde(default)]
    pub details: String,
    #[serde(default)]
    pub test_strategy: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Subtask>,
}

/// Metadata block of a task set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TaskSetMetadata {
    pub project_name: String,
    pub total_tasks: usize,
    pub source_file: String,
    pub generated_at: String,
}

/// A collection of tasks plus metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskSet {
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub metadata: TaskSetMetadata,
}

/// Violations of task set invariants
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskSetError {
    #[error("metadata declares {declared} tasks but the set contains {actual}")]
    TotalMismatch { declared: usize, actual: usize },

    #[error("task id {0} appears more than once")]
    DuplicateId(TaskId),

    #[error("task {task} depends on task {dependency}, which is not a lower-numbered task")]
    ForwardDependency { task: TaskId, dependency: TaskId },

    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    #[error("requested task count must be at least 1")]
    ZeroTaskCount,
}

impl TaskSet {
    /// Check the invariants providers are instructed to honour
    ///
    /// `metadata.total_tasks` must match the number of tasks, ids must be
    /// unique, and every dependency must reference a lower-numbered task.
    pub fn validate(&self) -> Result<(), TaskSetError> {
        if self.metadata.total_tasks != self.tasks.len() {
            return Err(TaskSetError::TotalMismatch {
                declared: self.metadata.total_tasks,
                actual: self.tasks.len(),
            });
        }

        let mut seen = HashSet::new();
        for task in &self.tasks {
            if !seen.insert(task.id) {
                return Err(TaskSetError::DuplicateId(task.id));
            }
            if let Some(&dependency) = task.dependencies.iter().find(|&&dep| dep >= task.id) {
                return Err(TaskSetError::ForwardDependency {
                    task: task.id,
                    dependency,
                });
            }
        }

        Ok(())
    }

    pub fn find_task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn find_task_mut(&mut self, id: TaskId) -> Option<&mut Task> {
        self.tasks.iter_mut().find(|task| task.id == id)
    }

    /// Set the status of a task; marking a task done also completes its subtasks
    pub fn set_status(&mut self, id: TaskId, status: TaskStatus) -> Result<(), TaskSetError> {
        let task = self
            .find_task_mut(id)
            .ok_or(TaskSetError::TaskNotFound(id))?;

        task.status = status;
        if status == TaskStatus::Done {
            for subtask in &mut task.subtasks {
                subtask.status = TaskStatus::Done;
            }
        }
        Ok(())
    }

    /// Replace the subtasks of a task
    pub fn replace_subtasks(
        &mut self,
        id: TaskId,
        subtasks: Vec<Subtask>,
    ) -> Result<(), TaskSetError> {
        let task = self
            .find_task_mut(id)
            .ok_or(TaskSetError::TaskNotFound(id))?;
        task.subtasks = subtasks;
        Ok(())
    }

    /// The next task to work on
    ///
    /// Candidates are pending or in-progress tasks whose dependencies are all
    /// done. Higher priority wins, then the lower id.
    pub fn next_task(&self) -> Option<&Task> {
        let done: HashSet<TaskId> = self
            .tasks
            .iter()
            .filter(|task| task.status == TaskStatus::Done)
            .map(|task| task.id)
            .collect();

        self.tasks
            .iter()
            .filter(|task| task.status != TaskStatus::Done)
            .filter(|task| task.dependencies.iter().all(|dep| done.contains(dep)))
            .min_by_key(|task| (std::cmp::Reverse(task.priority.rank()), task.id))
    }
}

/// Input for one task generation request
#[derive(Debug, Clone, PartialEq)]
pub struct TaskSpecRequest {
    /// Raw requirements text sent to the provider as the user message
    pub source_content: String,
    /// Name of the document the content came from, e.g. a file name
    pub source_identifier: String,
    /// Number of tasks to ask for, at least 1
    pub requested_task_count: u32,
}

impl TaskSpecRequest {
    /// Build a request, rejecting a task count of zero
    pub fn new(
        source_content: impl Into<String>,
        source_identifier: impl Into<String>,
        requested_task_count: u32,
    ) -> Result<Self, TaskSetError> {
        if requested_task_count == 0 {
            return Err(TaskSetError::ZeroTaskCount);
        }

        Ok(Self {
            source_content: source_content.into(),
            source_identifier: source_identifier.into(),
            requested_task_count,
        })
    }
}
