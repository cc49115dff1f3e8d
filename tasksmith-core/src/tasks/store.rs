//! Task file persistence

use super::types::{TaskSet, TaskSetError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Default location of the task file, relative to the project root
pub const DEFAULT_TASKS_FILE: &str = "tasks/tasks.json";

/// Errors raised while reading or writing the task file
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error on task file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Task file '{path}' is not a valid task set: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Task(#[from] TaskSetError),
}

/// Read a task set from disk
pub fn load<P: AsRef<Path>>(path: P) -> Result<TaskSet, StoreError> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let task_set = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Loaded task file {}", path.display());
    Ok(task_set)
}

/// Write a task set to disk as pretty JSON, creating parent directories
pub fn save<P: AsRef<Path>>(path: P, task_set: &TaskSet) -> Result<(), StoreError> {
    let path = path.as_ref();
    let io_err = |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let mut json = serde_json::to_string_pretty(task_set).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    json.push('\n');

    fs::write(path, json).map_err(io_err)?;
    debug!(
        "Wrote {} tasks to {}",
        task_set.tasks.len(),
        path.display()
    );
    Ok(())
}
