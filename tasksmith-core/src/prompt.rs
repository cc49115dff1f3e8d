//! Prompt templates for task generation and breakdown

use crate::providers::Prompt;
use crate::tasks::{Task, TaskSpecRequest};

const TASK_GENERATION_TEMPLATE: &str = r#"You are an AI assistant helping to break down a Product Requirements Document (PRD) into a set of sequential development tasks.
Your goal is to create {num_tasks} well-structured, actionable development tasks based on the PRD provided.

Each task should follow this JSON structure:
{
  "id": number,
  "title": string,
  "description": string,
  "status": "pending",
  "dependencies": number[] (IDs of tasks this depends on),
  "priority": "high" | "medium" | "low",
  "details": string (implementation details),
  "testStrategy": string (validation approach)
}

Guidelines:
1. Create exactly {num_tasks} tasks, numbered from 1 to {num_tasks}
2. Each task should be atomic and focused on a single responsibility
3. Order tasks logically, considering dependencies and implementation sequence
4. Early tasks should focus on setup and core functionality, later tasks on advanced features
5. Include clear validation/testing approach for each task
6. Set appropriate dependency IDs; a task can only depend on tasks with lower IDs
7. Assign priority (high/medium/low) based on criticality and dependency order
8. Include detailed implementation guidance in the "details" field

Expected output format:
{
  "tasks": [
    {
      "id": 1,
      "title": "Setup Project Repository",
      "description": "...",
      ...
    },
    ...
  ],
  "metadata": {
    "projectName": "PRD Implementation",
    "totalTasks": {num_tasks},
    "sourceFile": "{source_identifier}",
    "generatedAt": "YYYY-MM-DD"
  }
}

Important: Your response must be valid JSON only, with no additional explanation or comments."#;

const SUBTASK_TEMPLATE: &str = r#"You are an AI assistant helping with task breakdown for software development.
You need to break down a high-level task into {num_subtasks} specific subtasks that can be implemented one by one.

Subtasks should:
1. Be specific and actionable implementation steps
2. Follow a logical sequence
3. Each handle a distinct part of the parent task
4. Include clear guidance on implementation approach
5. Have appropriate dependency chains between subtasks, referring only to lower subtask IDs
6. Collectively cover all aspects of the parent task

For each subtask, provide:
- id: a sequential number starting at 1
- title: a clear, specific title
- description: a detailed description
- status: "pending"
- dependencies: IDs of prerequisite subtasks
- details: implementation details

Return a JSON array of exactly {num_subtasks} subtask objects and nothing else. Your response must be valid JSON only, with no additional explanation or comments."#;

/// Build the prompt that turns a requirements document into a task set
pub fn task_generation_prompt(request: &TaskSpecRequest) -> Prompt {
    let system = TASK_GENERATION_TEMPLATE
        .replace("{num_tasks}", &request.requested_task_count.to_string())
        .replace("{source_identifier}", &request.source_identifier);

    Prompt::new(system, request.source_content.clone())
}

/// Build the prompt that breaks a task into subtasks
pub fn subtask_prompt(task: &Task, num_subtasks: u32, extra_context: Option<&str>) -> Prompt {
    let system = SUBTASK_TEMPLATE.replace("{num_subtasks}", &num_subtasks.to_string());

    let mut user = format!(
        "Please break down this task into {} specific, actionable subtasks:\n\n\
         Task ID: {}\n\
         Title: {}\n\
         Description: {}\n\
         Current details: {}",
        num_subtasks,
        task.id,
        task.title,
        task.description,
        if task.details.is_empty() {
            "None provided"
        } else {
            task.details.as_str()
        }
    );

    if let Some(context) = extra_context.map(str::trim).filter(|c| !c.is_empty()) {
        user.push_str("\n\nAdditional context: ");
        user.push_str(context);
    }

    Prompt::new(system, user)
}
