pub mod loader;
pub mod schema;

pub use loader::{apply_env_overrides, database_path, load_config, load_config_from_str};
pub use schema::{
    AuthConfig, Config, DatabaseConfig, ExtractionConfig, FilesystemConfig, IntakeConfig,
    LogFormat, LoggingConfig, ServerConfig, StorageConfig, SupabaseConfig,
};
