//! Integration tests for configuration loading and validation

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use tasksmith_core::config::{
    apply_env_overrides, load_from_file, load_from_json, load_from_yaml, ConfigError, Settings,
    TlsVerification,
};
use tasksmith_core::providers::BackoffStrategy;
use tempfile::TempDir;

/// Helper to create a test config file
fn create_test_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_load_valid_yaml_config() {
    std::env::set_var("TASKSMITH_TEST_CURSOR_KEY", "cur-from-env");

    let yaml = r#"
provider:
  provider_name: cursor
  model_name: claude-3-5-sonnet
  max_tokens: 8000
  temperature: 0.2
providers:
  cursor:
    api_key: ${TASKSMITH_TEST_CURSOR_KEY}
    endpoint: https://cursor.example/v1/chat/completions
fallback_provider: claude
retry:
  max_retries: 3
  backoff:
    kind: exponential
    initial_delay_ms: 100
    max_delay_ms: 2000
    base: 2.0
    jitter_factor: 0.1
strict_validation: true
"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "tasksmith.yaml", yaml);

    let settings = load_from_yaml(path).unwrap();
    assert_eq!(settings.provider.provider_name, "cursor");
    assert_eq!(settings.provider.max_tokens, 8000);
    assert_eq!(
        settings
            .providers
            .cursor
            .api_key()
            .map(|key| key.expose_secret().to_string()),
        Some("cur-from-env".to_string())
    );
    assert_eq!(settings.retry.max_retries, 3);
    assert!(matches!(
        settings.retry.backoff,
        BackoffStrategy::Exponential { initial_delay_ms: 100, .. }
    ));
    assert!(settings.strict_validation);

    std::env::remove_var("TASKSMITH_TEST_CURSOR_KEY");
}

#[test]
fn test_load_valid_json_config() {
    let json = r#"{
  "provider": {"provider_name": "openai", "model_name": "gpt-4o"},
  "tls": "disabled",
  "default_subtasks": 5
}"#;

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "tasksmith.json", json);

    let settings = load_from_json(&path).unwrap();
    assert_eq!(settings.provider.provider_name, "openai");
    assert_eq!(settings.tls, TlsVerification::Disabled);
    assert_eq!(settings.default_subtasks, 5);
    // unspecified fields keep their defaults
    assert_eq!(settings.provider.max_tokens, 4000);

    let by_extension = load_from_file(&path).unwrap();
    assert_eq!(by_extension.provider, settings.provider);
}

#[test]
fn test_missing_env_var_in_config() {
    let yaml = "providers:\n  anthropic:\n    api_key: ${TASKSMITH_TEST_UNSET_VAR}\n";

    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "tasksmith.yaml", yaml);

    match load_from_yaml(path) {
        Err(ConfigError::MissingEnvVar { var }) => {
            assert_eq!(var, "TASKSMITH_TEST_UNSET_VAR");
        }
        other => panic!("expected MissingEnvVar, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_invalid_yaml_reports_location() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "broken.yaml", "provider:\n  max_tokens: [1, 2\n");

    assert!(matches!(
        load_from_yaml(path),
        Err(ConfigError::Parse { .. })
    ));
}

#[test]
fn test_invalid_values_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(&dir, "tasksmith.yaml", "provider:\n  temperature: 2.5\n");

    match load_from_yaml(path) {
        Err(ConfigError::Invalid(err)) => {
            assert_eq!(err.field_path, "provider.temperature");
        }
        other => panic!("expected Invalid, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_missing_file() {
    let result = load_from_yaml("/definitely/not/here/tasksmith.yaml");
    assert!(matches!(result, Err(ConfigError::Read { .. })));
}

#[test]
fn test_env_overrides_file_values() {
    let dir = TempDir::new().unwrap();
    let path = create_test_file(
        &dir,
        "tasksmith.yaml",
        "provider:\n  provider_name: cursor\n  max_tokens: 8000\n",
    );
    let mut settings = load_from_yaml(path).unwrap();

    let env: HashMap<&str, &str> = [
        ("AI_PROVIDER", "perplexity"),
        ("PERPLEXITY_API_KEY", "pplx-123"),
        ("PERPLEXITY_MODEL", "sonar"),
        ("MAX_TOKENS", ""),
    ]
    .into_iter()
    .collect();
    apply_env_overrides(&mut settings, |name| env.get(name).map(|v| v.to_string())).unwrap();

    assert_eq!(settings.provider.provider_name, "perplexity");
    // blank values leave the file value in place
    assert_eq!(settings.provider.max_tokens, 8000);
    assert_eq!(settings.providers.perplexity.model.as_deref(), Some("sonar"));
    assert!(settings.providers.perplexity.api_key().is_some());
}

#[test]
fn test_secrets_never_printed() {
    let mut settings = Settings::default();
    apply_env_overrides(&mut settings, |name| {
        (name == "ANTHROPIC_API_KEY").then(|| "sk-ant-very-secret".to_string())
    })
    .unwrap();

    let debug = format!("{:?}", settings);
    assert!(!debug.contains("very-secret"));
    assert!(debug.contains("[REDACTED]"));
}
