//! Tasksmith Core Library
//!
//! Turns requirements documents into structured task sets by calling an AI
//! provider, retrying failed calls and normalizing the provider's response.

pub mod config;
pub mod http;
pub mod prompt;
pub mod providers;
pub mod tasks;

pub use config::{load_settings, ProviderConfig, Settings};
pub use providers::{Dispatcher, GenerateError, Generation, ProviderRegistry};
pub use tasks::{Task, TaskSet, TaskSpecRequest, TaskStatus};

/// Returns the version of the Tasksmith Core library.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
