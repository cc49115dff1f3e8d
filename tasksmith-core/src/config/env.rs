//! Environment variable interpolation and overrides for configuration

use super::error::ConfigError;
use super::schema::{Settings, TlsVerification};
use super::secrets::SecretString;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("env var pattern is a valid regex")
});

/// Interpolate `${VAR}` references in a configuration string from the process environment
pub fn interpolate_env_vars(content: &str) -> Result<String, ConfigError> {
    interpolate_with(content, |name| std::env::var(name).ok())
}

/// Interpolate `${VAR}` references using the given lookup
pub fn interpolate_with<F>(content: &str, lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = content.to_string();

    for cap in ENV_VAR_PATTERN.captures_iter(content) {
        let var_name = &cap[1];
        match lookup(var_name) {
            Some(value) => result = result.replace(&cap[0], &value),
            None => {
                return Err(ConfigError::MissingEnvVar {
                    var: var_name.to_string(),
                })
            }
        }
    }

    Ok(result)
}

/// Overlay environment keys on top of the given settings
///
/// Environment values take precedence over the config file and the built-in
/// defaults. Blank values are ignored.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    if let Some(value) = get("AI_PROVIDER") {
        settings.provider.provider_name = value.trim().to_string();
    }
    if let Some(value) = get("MODEL") {
        settings.provider.model_name = value;
    }
    if let Some(value) = get("MAX_TOKENS") {
        settings.provider.max_tokens = parse_var("MAX_TOKENS", &value, "a positive integer")?;
    }
    if let Some(value) = get("TEMPERATURE") {
        settings.provider.temperature = parse_var("TEMPERATURE", &value, "a number")?;
    }

    let providers = &mut settings.providers;
    if let Some(value) = get("ANTHROPIC_API_KEY") {
        providers.anthropic.api_key = Some(SecretString::new(value));
    }
    if let Some(value) = get("CURSOR_API_KEY") {
        providers.cursor.api_key = Some(SecretString::new(value));
    }
    if let Some(value) = get("CURSOR_API_ENDPOINT") {
        providers.cursor.endpoint = Some(value);
    }
    if let Some(value) = get("CURSOR_MODEL") {
        providers.cursor.model = Some(value);
    }
    if let Some(value) = get("OPENAI_API_KEY") {
        providers.openai.api_key = Some(SecretString::new(value));
    }
    if let Some(value) = get("OPENAI_MODEL") {
        providers.openai.model = Some(value);
    }
    if let Some(value) = get("PERPLEXITY_API_KEY") {
        providers.perplexity.api_key = Some(SecretString::new(value));
    }
    if let Some(value) = get("PERPLEXITY_MODEL") {
        providers.perplexity.model = Some(value);
    }

    if let Some(value) = get("FALLBACK_PROVIDER") {
        settings.fallback_provider = value.trim().to_string();
    }
    if let Some(value) = get("PROJECT_NAME") {
        settings.project_name = value;
    }
    if let Some(value) = get("DEFAULT_SUBTASKS") {
        settings.default_subtasks =
            parse_var("DEFAULT_SUBTASKS", &value, "a positive integer")?;
    }
    if let Some(value) = get("DISABLE_TLS_VERIFY") {
        if parse_flag("DISABLE_TLS_VERIFY", &value)? {
            settings.tls = TlsVerification::Disabled;
        }
    }
    if let Some(value) = get("STRICT_VALIDATION") {
        settings.strict_validation = parse_flag("STRICT_VALIDATION", &value)?;
    }
    if let Some(value) = get("LOG_LEVEL") {
        settings.log_level = value;
    }

    Ok(())
}

fn parse_var<T: FromStr>(var: &str, value: &str, expected: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnvValue {
            var: var.to_string(),
            value: value.to_string(),
            expected: expected.to_string(),
        })
}

fn parse_flag(var: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvValue {
            var: var.to_string(),
            value: value.to_string(),
            expected: "a boolean".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_interpolate_env_vars() {
        let lookup = lookup_from(&[("TEST_VAR", "test_value")]);

        let result = interpolate_with("api_key: ${TEST_VAR}", lookup).unwrap();
        assert_eq!(result, "api_key: test_value");
    }

    #[test]
    fn test_missing_env_var() {
        let result = interpolate_with("api_key: ${MISSING_VAR}", lookup_from(&[]));

        if let Err(ConfigError::MissingEnvVar { var }) = result {
            assert_eq!(var, "MISSING_VAR");
        } else {
            panic!("Expected MissingEnvVar error");
        }
    }

    #[test]
    fn test_multiple_env_vars() {
        let lookup = lookup_from(&[("VAR1", "value1"), ("VAR2", "value2")]);

        let result = interpolate_with("key1: ${VAR1}, key2: ${VAR2}", lookup).unwrap();
        assert_eq!(result, "key1: value1, key2: value2");
    }

    #[test]
    fn test_env_overrides_take_precedence() {
        let mut settings = Settings::default();
        settings.provider.model_name = "from-file".to_string();

        let lookup = lookup_from(&[
            ("AI_PROVIDER", "Cursor"),
            ("MODEL", "from-env"),
            ("MAX_TOKENS", "8000"),
            ("TEMPERATURE", "0.2"),
            ("CURSOR_API_KEY", "cursor-key-123"),
            ("CURSOR_API_ENDPOINT", "https://cursor.internal/v1/chat"),
        ]);
        apply_env_overrides(&mut settings, lookup).unwrap();

        assert_eq!(settings.provider.provider_name, "Cursor");
        assert_eq!(settings.provider.model_name, "from-env");
        assert_eq!(settings.provider.max_tokens, 8000);
        assert!((settings.provider.temperature - 0.2).abs() < f32::EPSILON);
        assert_eq!(
            settings.providers.cursor.api_key().map(|k| k.expose_secret()),
            Some("cursor-key-123")
        );
        assert_eq!(
            settings.providers.cursor.endpoint.as_deref(),
            Some("https://cursor.internal/v1/chat")
        );
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut settings = Settings::default();
        apply_env_overrides(&mut settings, lookup_from(&[("MODEL", "  ")])).unwrap();
        assert_eq!(settings.provider.model_name, super::super::schema::DEFAULT_MODEL);
    }

    #[test]
    fn test_invalid_numeric_value() {
        let mut settings = Settings::default();
        let err = apply_env_overrides(&mut settings, lookup_from(&[("MAX_TOKENS", "lots")]))
            .unwrap_err();

        assert!(matches!(err, ConfigError::InvalidEnvValue { ref var, .. } if var == "MAX_TOKENS"));
    }

    #[test]
    fn test_tls_override_flag() {
        let mut settings = Settings::default();
        apply_env_overrides(&mut settings, lookup_from(&[("DISABLE_TLS_VERIFY", "true")]))
            .unwrap();
        assert_eq!(settings.tls, TlsVerification::Disabled);

        let mut settings = Settings::default();
        let err = apply_env_overrides(&mut settings, lookup_from(&[("DISABLE_TLS_VERIFY", "maybe")]));
        assert!(err.is_err());
    }
}
