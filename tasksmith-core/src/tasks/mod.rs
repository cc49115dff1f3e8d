//! Task model and task file storage

pub mod store;
pub mod types;

pub use store::{load, save, StoreError, DEFAULT_TASKS_FILE};
pub use types::{
    Priority, Subtask, Task, TaskId, TaskSet, TaskSetError, TaskSetMetadata, TaskSpecRequest,
    TaskStatus,
};
