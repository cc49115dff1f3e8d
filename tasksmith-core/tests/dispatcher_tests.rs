//! Dispatcher behaviour against scripted providers
//!
//! Each scripted provider replays a fixed list of results and counts how
//! often it was invoked, so retry and fallback behaviour can be checked
//! without a network.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tasksmith_core::config::ProviderConfig;
use tasksmith_core::http::InvokeError;
use tasksmith_core::providers::{
    BackoffStrategy, Dispatcher, EnvelopeKind, FaultKind, GenerateError, Prompt,
    ProviderRegistry, RawProviderResponse, RetryPolicy, TaskProvider,
};
use tasksmith_core::tasks::{Priority, Task, TaskSpecRequest, TaskStatus};

struct ScriptedProvider {
    tag: &'static str,
    envelope: EnvelopeKind,
    script: Mutex<VecDeque<Result<Value, InvokeError>>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<Prompt>>,
}

impl ScriptedProvider {
    fn new(
        tag: &'static str,
        envelope: EnvelopeKind,
        script: Vec<Result<Value, InvokeError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            tag,
            envelope,
            script: Mutex::new(script.into()),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskProvider for ScriptedProvider {
    fn tag(&self) -> &str {
        self.tag
    }

    fn envelope(&self) -> EnvelopeKind {
        self.envelope
    }

    fn describe(&self) -> String {
        format!("scripted {}", self.tag)
    }

    async fn invoke(
        &self,
        _config: &ProviderConfig,
        prompt: &Prompt,
    ) -> Result<RawProviderResponse, InvokeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(InvokeError::Other("script exhausted".to_string())))
    }
}

fn task_set_json(total: usize) -> Value {
    let tasks: Vec<Value> = (1..=total)
        .map(|id| {
            json!({
                "id": id,
                "title": format!("Task {}", id),
                "description": "Do the thing",
                "status": "pending",
                "dependencies": if id > 1 { vec![id - 1] } else { vec![] },
                "priority": "high",
                "details": "",
                "testStrategy": ""
            })
        })
        .collect();

    json!({
        "tasks": tasks,
        "metadata": {
            "projectName": "PRD Implementation",
            "totalTasks": total,
            "sourceFile": "f.txt",
            "generatedAt": "2025-01-01"
        }
    })
}

fn claude_envelope(payload: &Value) -> Value {
    json!({"content": [{"type": "text", "text": payload.to_string()}]})
}

fn cursor_envelope(payload: &Value) -> Value {
    json!({"content": payload.to_string()})
}

fn server_error() -> InvokeError {
    InvokeError::Status {
        status: 500,
        message: "internal error".to_string(),
        retry_after_secs: None,
    }
}

fn dispatcher_with(providers: Vec<Arc<ScriptedProvider>>, fallback: &str) -> Dispatcher {
    let mut registry = ProviderRegistry::new().with_fallback(fallback);
    for provider in providers {
        registry.register_instance(provider);
    }
    Dispatcher::new(Arc::new(registry))
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("tasksmith_core=debug")
        .with_test_writer()
        .try_init();
}

fn request() -> TaskSpecRequest {
    TaskSpecRequest::new("x", "f.txt", 5).unwrap()
}

#[tokio::test]
async fn test_claude_invoked_once_on_success() {
    let payload = task_set_json(5);
    let claude = ScriptedProvider::new(
        "claude",
        EnvelopeKind::Anthropic,
        vec![Ok(claude_envelope(&payload))],
    );
    let dispatcher = dispatcher_with(vec![claude.clone()], "claude");

    let generation = dispatcher
        .generate(&ProviderConfig::for_provider("claude"), &request())
        .await
        .unwrap();

    assert_eq!(claude.calls(), 1);
    assert_eq!(generation.provider, "claude");
    assert_eq!(generation.retries, 0);
    assert!(generation.faults.is_empty());
    assert_eq!(serde_json::to_value(&generation.value).unwrap(), payload);

    let prompts = claude.prompts.lock().unwrap();
    assert_eq!(prompts[0].user, "x");
    assert!(prompts[0].system.contains("create 5 well-structured"));
}

#[tokio::test]
async fn test_two_failures_then_success_records_two_retries() {
    let payload = task_set_json(5);
    let cursor = ScriptedProvider::new(
        "cursor",
        EnvelopeKind::Cursor,
        vec![
            Err(server_error()),
            Err(InvokeError::Transport {
                message: "connection reset".to_string(),
                request_sent: true,
            }),
            Ok(cursor_envelope(&payload)),
        ],
    );
    let dispatcher = dispatcher_with(vec![cursor.clone()], "claude");

    let generation = dispatcher
        .generate(&ProviderConfig::for_provider("cursor"), &request())
        .await
        .unwrap();

    assert_eq!(cursor.calls(), 3);
    assert_eq!(generation.retries, 2);
    let kinds: Vec<FaultKind> = generation.faults.iter().map(|f| f.kind).collect();
    assert_eq!(kinds, vec![FaultKind::ServerError, FaultKind::Network]);
    assert_eq!(generation.value.tasks.len(), 5);
}

#[tokio::test]
async fn test_exhausted_after_three_attempts() {
    init_tracing();
    let claude = ScriptedProvider::new(
        "claude",
        EnvelopeKind::Anthropic,
        vec![
            Err(server_error()),
            Err(server_error()),
            Err(server_error()),
            Ok(claude_envelope(&task_set_json(5))),
        ],
    );
    let dispatcher = dispatcher_with(vec![claude.clone()], "claude");

    let err = dispatcher
        .generate(&ProviderConfig::for_provider("claude"), &request())
        .await
        .unwrap_err();

    assert_eq!(claude.calls(), 3);
    match err {
        GenerateError::ExhaustedRetries {
            provider,
            attempts,
            last,
        } => {
            assert_eq!(provider, "claude");
            assert_eq!(attempts, 3);
            assert_eq!(last.kind, FaultKind::ServerError);
        }
        other => panic!("expected ExhaustedRetries, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unknown_provider_uses_fallback() {
    init_tracing();
    let claude = ScriptedProvider::new(
        "claude",
        EnvelopeKind::Anthropic,
        vec![Ok(claude_envelope(&task_set_json(5)))],
    );
    let dispatcher = dispatcher_with(vec![claude.clone()], "claude");

    let generation = dispatcher
        .generate(&ProviderConfig::for_provider("Gemini"), &request())
        .await
        .unwrap();

    assert_eq!(generation.provider, "claude");
    assert_eq!(claude.calls(), 1);
}

#[tokio::test]
async fn test_unsupported_without_fallback() {
    let cursor = ScriptedProvider::new("cursor", EnvelopeKind::Cursor, vec![]);
    let dispatcher = dispatcher_with(vec![cursor.clone()], "claude");

    let err = dispatcher
        .generate(&ProviderConfig::for_provider("gemini"), &request())
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::UnsupportedProvider { .. }));
    assert_eq!(err.fault_kind(), FaultKind::Unsupported);
    assert_eq!(cursor.calls(), 0);
}

#[tokio::test]
async fn test_parse_failure_retried_by_default() {
    let cursor = ScriptedProvider::new(
        "cursor",
        EnvelopeKind::Cursor,
        vec![
            Ok(json!({"content": "Sure! Here are your tasks:"})),
            Ok(cursor_envelope(&task_set_json(5))),
        ],
    );
    let dispatcher = dispatcher_with(vec![cursor.clone()], "claude");

    let generation = dispatcher
        .generate(&ProviderConfig::for_provider("cursor"), &request())
        .await
        .unwrap();

    assert_eq!(generation.retries, 1);
    assert_eq!(generation.faults[0].kind, FaultKind::ParseFailure);
}

#[tokio::test]
async fn test_parse_failure_not_retried_when_disabled() {
    let cursor = ScriptedProvider::new(
        "cursor",
        EnvelopeKind::Cursor,
        vec![
            Ok(json!({"id": "no content here"})),
            Ok(cursor_envelope(&task_set_json(5))),
        ],
    );
    let dispatcher = dispatcher_with(vec![cursor.clone()], "claude")
        .with_retry_policy(RetryPolicy::default().with_parse_retries(false));

    let err = dispatcher
        .generate(&ProviderConfig::for_provider("cursor"), &request())
        .await
        .unwrap_err();

    assert_eq!(cursor.calls(), 1);
    match err {
        GenerateError::Fault { fault, .. } => {
            assert_eq!(fault.kind, FaultKind::ParseFailure);
            assert!(fault.raw_message.contains("No content found"));
        }
        other => panic!("expected Fault, got {other:?}"),
    }
}

#[tokio::test]
async fn test_auth_fault_not_retried_with_no_retry_policy() {
    let claude = ScriptedProvider::new(
        "claude",
        EnvelopeKind::Anthropic,
        vec![Err(InvokeError::Status {
            status: 401,
            message: "invalid x-api-key".to_string(),
            retry_after_secs: None,
        })],
    );
    let dispatcher =
        dispatcher_with(vec![claude.clone()], "claude").with_retry_policy(RetryPolicy::no_retry());

    let err = dispatcher
        .generate(&ProviderConfig::for_provider("claude"), &request())
        .await
        .unwrap_err();

    assert_eq!(claude.calls(), 1);
    assert_eq!(err.fault_kind(), FaultKind::Auth);
}

#[tokio::test]
async fn test_strict_validation_rejects_forward_dependency() {
    let mut bad = task_set_json(2);
    bad["tasks"][0]["dependencies"] = json!([2]);
    let cursor = ScriptedProvider::new(
        "cursor",
        EnvelopeKind::Cursor,
        vec![Ok(cursor_envelope(&bad)), Ok(cursor_envelope(&task_set_json(2)))],
    );
    let dispatcher = dispatcher_with(vec![cursor.clone()], "claude").with_strict_validation(true);

    let generation = dispatcher
        .generate(&ProviderConfig::for_provider("cursor"), &request())
        .await
        .unwrap();

    assert_eq!(generation.retries, 1);
    assert!(generation.faults[0].raw_message.contains("invalid"));
}

#[tokio::test]
async fn test_lenient_validation_accepts_forward_dependency() {
    let mut bad = task_set_json(2);
    bad["tasks"][0]["dependencies"] = json!([2]);
    let cursor = ScriptedProvider::new(
        "cursor",
        EnvelopeKind::Cursor,
        vec![Ok(cursor_envelope(&bad))],
    );
    let dispatcher = dispatcher_with(vec![cursor.clone()], "claude");

    let generation = dispatcher
        .generate(&ProviderConfig::for_provider("cursor"), &request())
        .await
        .unwrap();

    assert_eq!(generation.value.tasks[0].dependencies, vec![2]);
}

#[tokio::test]
async fn test_fixed_backoff_between_attempts() {
    let cursor = ScriptedProvider::new(
        "cursor",
        EnvelopeKind::Cursor,
        vec![Err(server_error()), Ok(cursor_envelope(&task_set_json(5)))],
    );
    let dispatcher = dispatcher_with(vec![cursor.clone()], "claude").with_retry_policy(
        RetryPolicy::default().with_backoff(BackoffStrategy::Fixed { delay_ms: 20 }),
    );

    let started = std::time::Instant::now();
    let generation = dispatcher
        .generate(&ProviderConfig::for_provider("cursor"), &request())
        .await
        .unwrap();

    assert_eq!(generation.retries, 1);
    assert!(started.elapsed() >= std::time::Duration::from_millis(20));
}

#[tokio::test]
async fn test_expand_returns_subtasks() {
    let subtasks = json!([
        {"id": 1, "title": "Schema", "description": "", "status": "pending", "dependencies": [], "details": ""},
        {"id": 2, "title": "Handlers", "description": "", "status": "pending", "dependencies": [1], "details": ""}
    ]);
    let cursor = ScriptedProvider::new(
        "cursor",
        EnvelopeKind::Cursor,
        vec![Ok(cursor_envelope(&subtasks))],
    );
    let dispatcher = dispatcher_with(vec![cursor.clone()], "claude");
    let task = Task {
        id: 3,
        title: "Build API".to_string(),
        description: "REST endpoints".to_string(),
        status: TaskStatus::Pending,
        priority: Priority::High,
        dependencies: vec![],
        details: String::new(),
        test_strategy: String::new(),
        subtasks: vec![],
    };

    let generation = dispatcher
        .expand(&ProviderConfig::for_provider("cursor"), &task, 2, Some("use axum"))
        .await
        .unwrap();

    assert_eq!(generation.value.len(), 2);
    assert_eq!(generation.value[1].dependencies, vec![1]);

    let prompts = cursor.prompts.lock().unwrap();
    assert!(prompts[0].user.contains("Task ID: 3"));
    assert!(prompts[0].user.contains("use axum"));
}

#[tokio::test]
async fn test_expand_rejects_zero_subtasks() {
    let cursor = ScriptedProvider::new("cursor", EnvelopeKind::Cursor, vec![]);
    let dispatcher = dispatcher_with(vec![cursor.clone()], "claude");
    let task = Task {
        id: 1,
        title: "t".to_string(),
        description: String::new(),
        status: TaskStatus::Pending,
        priority: Priority::Medium,
        dependencies: vec![],
        details: String::new(),
        test_strategy: String::new(),
        subtasks: vec![],
    };

    let err = dispatcher
        .expand(&ProviderConfig::for_provider("cursor"), &task, 0, None)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::InvalidRequest(_)));
    assert_eq!(cursor.calls(), 0);
}

#[tokio::test]
async fn test_generate_rejects_zero_tasks() {
    let claude = ScriptedProvider::new(
        "claude",
        EnvelopeKind::Anthropic,
        vec![Ok(claude_envelope(&task_set_json(1)))],
    );
    let dispatcher = dispatcher_with(vec![claude.clone()], "claude");
    let request = TaskSpecRequest {
        source_content: "x".to_string(),
        source_identifier: "f.txt".to_string(),
        requested_task_count: 0,
    };

    let err = dispatcher
        .generate(&ProviderConfig::for_provider("claude"), &request)
        .await
        .unwrap_err();

    assert!(matches!(err, GenerateError::InvalidRequest(_)));
    assert_eq!(claude.calls(), 0);
}
