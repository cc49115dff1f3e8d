//! Configuration module for Tasksmith
//!
//! Settings are layered: built-in defaults, then an optional YAML or JSON
//! config file (with `${VAR}` interpolation), then the process environment.

mod env;
mod error;
mod schema;
mod secrets;

pub use env::{apply_env_overrides, interpolate_env_vars, interpolate_with};
pub use error::{ConfigError, ValidationError, ValidationErrorKind};
pub use schema::{
    ConnectionConfig, ProviderAccess, ProviderAccessTable, ProviderConfig, Settings,
    TlsVerification, DEFAULT_MODEL, DEFAULT_PROVIDER,
};
pub use secrets::SecretString;

use std::fs;
use std::path::Path;

/// Load settings from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let interpolated = read_interpolated(path)?;

    let settings: Settings =
        serde_yaml::from_str(&interpolated).map_err(|e| ConfigError::Parse {
            path: path.to_string_lossy().to_string(),
            line: e.location().map(|l| l.line()),
            column: e.location().map(|l| l.column()),
            message: e.to_string(),
        })?;

    settings.validate()?;
    Ok(settings)
}

/// Load settings from a JSON file
pub fn load_from_json<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let interpolated = read_interpolated(path)?;

    let settings: Settings =
        serde_json::from_str(&interpolated).map_err(|e| ConfigError::Parse {
            path: path.to_string_lossy().to_string(),
            line: Some(e.line()),
            column: Some(e.column()),
            message: e.to_string(),
        })?;

    settings.validate()?;
    Ok(settings)
}

/// Load settings from a file, picking the format by extension
///
/// `.json` files are read as JSON, everything else as YAML.
pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("json") => load_from_json(path),
        _ => load_from_yaml(path),
    }
}

/// Resolve the effective settings for this process
///
/// Starts from the config file when one is given (built-in defaults
/// otherwise) and applies environment overrides on top.
pub fn load_settings(config_file: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = match config_file {
        Some(path) => load_from_file(path)?,
        None => Settings::default(),
    };

    apply_env_overrides(&mut settings, |name| std::env::var(name).ok())?;
    settings.validate()?;
    Ok(settings)
}

fn read_interpolated(path: &Path) -> Result<String, ConfigError> {
    let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;

    interpolate_env_vars(&content)
}
