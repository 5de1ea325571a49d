use serde::{Deserialize, Serialize};

use crate::extraction::gemini::{DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_ORGANIZATION};
use crate::secrets::SecretSource;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub intake: IntakeConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Origins allowed to call the API from a browser. Empty means same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// How long in-flight requests may run after a shutdown signal.
    #[serde(default = "default_shutdown_grace")]
    pub shutdown_grace_secs: u64,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_shutdown_grace() -> u64 {
    10
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            shutdown_grace_secs: default_shutdown_grace(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to `~/.ordarchive/data/ordarchive.db`.
    #[serde(default)]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// The shared access password.
    pub password: SecretSource,
    /// 64 hex chars. A random key is generated when absent.
    #[serde(default)]
    pub session_key: SecretSource,
    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,
    #[serde(default = "default_session_ttl_days")]
    pub session_ttl_days: u32,
    /// Adds `Secure` to the session cookie. Enable behind HTTPS.
    #[serde(default)]
    pub secure_cookie: bool,
}

fn default_cookie_name() -> String {
    "hr-auth-token".to_string()
}

fn default_session_ttl_days() -> u32 {
    7
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            password: SecretSource::default(),
            session_key: SecretSource::default(),
            cookie_name: default_cookie_name(),
            session_ttl_days: default_session_ttl_days(),
            secure_cookie: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    Supabase(SupabaseConfig),
    Filesystem(FilesystemConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project URL, e.g. `https://abcd.supabase.co`.
    pub url: String,
    #[serde(default = "default_bucket")]
    pub bucket: String,
    #[serde(default = "default_supabase_key")]
    pub api_key: SecretSource,
}

fn default_bucket() -> String {
    "orders".to_string()
}

fn default_supabase_key() -> SecretSource {
    SecretSource::from_env_var("SUPABASE_KEY")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesystemConfig {
    pub root: String,
    /// URL prefix under which `root` is served.
    pub public_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_extraction_base_url")]
    pub base_url: String,
    /// Without a key extraction is disabled.
    #[serde(default)]
    pub api_key: SecretSource,
    /// Organisation named in the extraction prompt.
    #[serde(default = "default_organization")]
    pub organization: String,
    #[serde(default = "default_extraction_timeout")]
    pub timeout_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_extraction_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_organization() -> String {
    DEFAULT_ORGANIZATION.to_string()
}

fn default_extraction_timeout() -> u64 {
    60
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            model: default_model(),
            base_url: default_extraction_base_url(),
            api_key: SecretSource::default(),
            organization: default_organization(),
            timeout_secs: default_extraction_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,
    /// Listing cache lifetime; 0 disables the cache.
    #[serde(default = "default_list_cache_ttl")]
    pub list_cache_ttl_secs: u64,
    #[serde(default = "default_list_cache_capacity")]
    pub list_cache_capacity: u64,
}

fn default_max_upload_bytes() -> usize {
    20 * 1024 * 1024
}

fn default_upload_timeout() -> u64 {
    30
}

fn default_list_cache_ttl() -> u64 {
    30
}

fn default_list_cache_capacity() -> u64 {
    256
}

impl Default for IntakeConfig {
    fn default() -> Self {
        Self {
            max_upload_bytes: default_max_upload_bytes(),
            upload_timeout_secs: default_upload_timeout(),
            list_cache_ttl_secs: default_list_cache_ttl(),
            list_cache_capacity: default_list_cache_capacity(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
