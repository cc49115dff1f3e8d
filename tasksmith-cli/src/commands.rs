//! Command handlers.

use crate::cli::Command;
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tasksmith_core::config::Settings;
use tasksmith_core::providers::{Dispatcher, ProviderRegistry};
use tasksmith_core::tasks::{self, Task, TaskId, TaskSet, TaskSpecRequest, TaskStatus};
use tracing::info;

/// Run a parsed command against the resolved settings.
pub async fn dispatch(command: Command, settings: &Settings) -> Result<()> {
    match command {
        Command::ParsePrd {
            input,
            num_tasks,
            output,
        } => parse_prd(settings, &input, num_tasks, &output).await,
        Command::List { file, status } => list(&file, status),
        Command::Next { file } => next(&file),
        Command::SetStatus { id, status, file } => set_status(&file, id, status),
        Command::Expand {
            id,
            num,
            prompt,
            file,
        } => {
            let count = num.unwrap_or(settings.default_subtasks);
            expand(settings, &file, id, count, prompt.as_deref()).await
        }
    }
}

fn dispatcher(settings: &Settings) -> Result<Dispatcher> {
    let registry = ProviderRegistry::from_settings(settings)
        .context("Failed to set up AI providers")?;
    Ok(Dispatcher::from_settings(Arc::new(registry), settings))
}

async fn parse_prd(settings: &Settings, input: &Path, num_tasks: u32, output: &Path) -> Result<()> {
    let content = fs::read_to_string(input)
        .with_context(|| format!("Failed to read requirements document {}", input.display()))?;
    let source = input
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());

    let request = TaskSpecRequest::new(content, source, num_tasks)?;
    let mut generation = dispatcher(settings)?
        .generate(&settings.provider, &request)
        .await
        .context("Task generation failed")?;

    let metadata = &mut generation.value.metadata;
    if metadata.project_name.trim().is_empty() {
        metadata.project_name = settings.project_name.clone();
    }

    tasks::save(output, &generation.value)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    info!(
        provider = %generation.provider,
        retries = generation.retries,
        "Wrote task file"
    );
    println!(
        "Generated {} tasks in {}",
        generation.value.tasks.len(),
        output.display()
    );
    Ok(())
}

fn list(file: &Path, status: Option<TaskStatus>) -> Result<()> {
    let task_set = load(file)?;
    let mut shown = 0;

    for task in task_set
        .tasks
        .iter()
        .filter(|task| status.map_or(true, |s| task.status == s))
    {
        println!("{}", summary_line(task));
        for subtask in &task.subtasks {
            println!("    {}.{} [{}] {}", task.id, subtask.id, subtask.status, subtask.title);
        }
        shown += 1;
    }

    if shown == 0 {
        println!("No tasks found");
    }
    Ok(())
}

fn next(file: &Path) -> Result<()> {
    let task_set = load(file)?;
    match task_set.next_task() {
        Some(task) => {
            println!("{}", summary_line(task));
            if !task.description.is_empty() {
                println!("\n{}", task.description);
            }
            if !task.details.is_empty() {
                println!("\nDetails:\n{}", task.details);
            }
            if !task.test_strategy.is_empty() {
                println!("\nTest strategy:\n{}", task.test_strategy);
            }
        }
        None => println!("No eligible tasks: everything is done or blocked"),
    }
    Ok(())
}

fn set_status(file: &Path, id: TaskId, status: TaskStatus) -> Result<()> {
    let mut task_set = load(file)?;
    task_set.set_status(id, status)?;
    save(file, &task_set)?;

    println!("Task {} is now {}", id, status);
    Ok(())
}

async fn expand(
    settings: &Settings,
    file: &Path,
    id: TaskId,
    count: u32,
    extra_context: Option<&str>,
) -> Result<()> {
    let mut task_set = load(file)?;
    let task = task_set
        .find_task(id)
        .ok_or_else(|| anyhow!("Task {} not found in {}", id, file.display()))?;

    let generation = dispatcher(settings)?
        .expand(&settings.provider, task, count, extra_context)
        .await
        .with_context(|| format!("Failed to expand task {}", id))?;

    let added = generation.value.len();
    task_set.replace_subtasks(id, generation.value)?;
    save(file, &task_set)?;

    println!("Added {} subtasks to task {}", added, id);
    Ok(())
}

fn load(file: &Path) -> Result<TaskSet> {
    tasks::load(file).with_context(|| format!("Failed to load tasks from {}", file.display()))
}

fn save(file: &Path, task_set: &TaskSet) -> Result<()> {
    tasks::save(file, task_set).with_context(|| format!("Failed to save {}", file.display()))
}

fn summary_line(task: &Task) -> String {
    let deps = if task.dependencies.is_empty() {
        String::new()
    } else {
        let ids: Vec<String> = task.dependencies.iter().map(ToString::to_string).collect();
        format!(" (depends on {})", ids.join(", "))
    };
    format!(
        "{:>3} [{}] ({}) {}{}",
        task.id, task.status, task.priority, task.title, deps
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tasksmith_core::tasks::{Priority, TaskSetMetadata};
    use tempfile::TempDir;

    fn sample() -> TaskSet {
        let task = |id: TaskId, deps: Vec<TaskId>| Task {
            id,
            title: format!("Task {id}"),
            description: String::new(),
            status: TaskStatus::Pending,
            priority: Priority::Medium,
            dependencies: deps,
            details: String::new(),
            test_strategy: String::new(),
            subtasks: vec![],
        };
        TaskSet {
            tasks: vec![task(1, vec![]), task(2, vec![1])],
            metadata: TaskSetMetadata {
                total_tasks: 2,
                ..TaskSetMetadata::default()
            },
        }
    }

    #[test]
    fn set_status_persists() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("tasks.json");
        tasks::save(&file, &sample()).unwrap();

        set_status(&file, 1, TaskStatus::Done).unwrap();

        let reloaded = tasks::load(&file).unwrap();
        assert_eq!(reloaded.tasks[0].status, TaskStatus::Done);
        assert_eq!(reloaded.next_task().map(|t| t.id), Some(2));
    }

    #[test]
    fn set_status_unknown_task_fails() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("tasks.json");
        tasks::save(&file, &sample()).unwrap();

        let err = set_status(&file, 9, TaskStatus::Done).unwrap_err();
        assert!(err.to_string().contains("task 9 not found"));
    }

    #[test]
    fn list_missing_file_has_context() {
        let dir = TempDir::new().unwrap();
        let err = list(&dir.path().join("missing.json"), None).unwrap_err();
        assert!(err.to_string().starts_with("Failed to load tasks from"));
    }

    #[test]
    fn summary_line_shows_dependencies() {
        let set = sample();
        assert_eq!(
            summary_line(&set.tasks[1]),
            "  2 [pending] (medium) Task 2 (depends on 1)"
        );
    }
}
