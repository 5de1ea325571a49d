use std::path::{Path, PathBuf};

use crate::config::schema::{Config, StorageConfig};
use crate::error::ConfigError;
use crate::secrets::expand_home;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub const ENV_HOST: &str = "ORDARCHIVE_HOST";
pub const ENV_PORT: &str = "ORDARCHIVE_PORT";
pub const ENV_DATABASE: &str = "ORDARCHIVE_DATABASE";

/// Loads, validates and env-overrides a config file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = load_config_from_str(&content)?;
    apply_env_overrides(&mut config)?;
    Ok(config)
}

/// Parses and validates config JSON. Environment overrides are not applied.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

/// Applies `ORDARCHIVE_HOST`, `ORDARCHIVE_PORT` and `ORDARCHIVE_DATABASE`.
pub fn apply_env_overrides(config: &mut Config) -> Result<(), ConfigError> {
    if let Some(host) = env_value(ENV_HOST) {
        config.server.host = host;
    }
    if let Some(port) = env_value(ENV_PORT) {
        config.server.port = port
            .parse::<u16>()
            .ok()
            .filter(|p| *p != 0)
            .ok_or_else(|| ConfigError::Validation {
                message: format!("{} must be a port number, got '{}'", ENV_PORT, port),
            })?;
    }
    if let Some(database) = env_value(ENV_DATABASE) {
        config.database.path = Some(database);
    }
    Ok(())
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// The SQLite file to open: the configured path (with `~` expanded) or the
/// per-user default.
pub fn database_path(config: &Config) -> Result<PathBuf, ConfigError> {
    match &config.database.path {
        Some(path) => Ok(PathBuf::from(expand_home(path))),
        None => crate::db::default_database_path().ok_or_else(|| ConfigError::Validation {
            message: "no home directory; set database.path".to_string(),
        }),
    }
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if !config.auth.password.is_configured() {
        return Err(ConfigError::Validation {
            message: "auth.password needs a value, file or env_var".to_string(),
        });
    }

    match &config.storage {
        StorageConfig::Supabase(supabase) => {
            url::Url::parse(&supabase.url).map_err(|e| ConfigError::Validation {
                message: format!("storage.url '{}' is not a URL: {}", supabase.url, e),
            })?;
            if !supabase.api_key.is_configured() {
                return Err(ConfigError::Validation {
                    message: "storage.api_key needs a value, file or env_var".to_string(),
                });
            }
        }
        StorageConfig::Filesystem(fs) => {
            if fs.root.trim().is_empty() {
                return Err(ConfigError::Validation {
                    message: "storage.root must not be empty".to_string(),
                });
            }
        }
    }

    if config.intake.max_upload_bytes == 0 {
        return Err(ConfigError::Validation {
            message: "intake.max_upload_bytes must be positive".to_string(),
        });
    }

    Ok(())
}
