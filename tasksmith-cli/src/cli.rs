//! CLI argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tasksmith_core::tasks::{TaskId, TaskStatus, DEFAULT_TASKS_FILE};

/// Top-level CLI parser for `tasksmith`.
#[derive(Debug, Parser)]
#[command(name = "tasksmith", version, about = "Turn requirements documents into tasks")]
pub struct Cli {
    /// YAML or JSON config file; environment variables override it.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// The command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported top-level subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate tasks from a requirements document.
    ParsePrd {
        /// Requirements document to read.
        input: PathBuf,
        /// Number of tasks to generate.
        #[arg(short, long, default_value_t = 10)]
        num_tasks: u32,
        /// Where to write the task file.
        #[arg(short, long, default_value = DEFAULT_TASKS_FILE)]
        output: PathBuf,
    },
    /// List tasks.
    List {
        #[arg(short, long, default_value = DEFAULT_TASKS_FILE)]
        file: PathBuf,
        /// Only show tasks with this status.
        #[arg(short, long)]
        status: Option<TaskStatus>,
    },
    /// Show the next task to work on.
    Next {
        #[arg(short, long, default_value = DEFAULT_TASKS_FILE)]
        file: PathBuf,
    },
    /// Update the status of a task.
    SetStatus {
        #[arg(short, long)]
        id: TaskId,
        #[arg(short, long)]
        status: TaskStatus,
        #[arg(short, long, default_value = DEFAULT_TASKS_FILE)]
        file: PathBuf,
    },
    /// Break a task down into subtasks.
    Expand {
        #[arg(short, long)]
        id: TaskId,
        /// Number of subtasks; defaults to the configured value.
        #[arg(short, long)]
        num: Option<u32>,
        /// Extra context for the provider.
        #[arg(short, long)]
        prompt: Option<String>,
        #[arg(short, long, default_value = DEFAULT_TASKS_FILE)]
        file: PathBuf,
    },
}
