use std::time::Duration;

use crate::config::Config;

/// Runtime limits of the intake flows.
#[derive(Debug, Clone)]
pub struct IntakeSettings {
    pub max_upload_bytes: usize,
    pub upload_timeout: Duration,
    /// Upper bound for one prefill call, on top of the extractor's own limit.
    pub prefill_timeout: Duration,
    pub list_cache_ttl: Duration,
    pub list_cache_capacity: u64,
}

impl IntakeSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_upload_bytes: config.intake.max_upload_bytes,
            upload_timeout: Duration::from_secs(config.intake.upload_timeout_secs),
            prefill_timeout: Duration::from_secs(config.extraction.timeout_secs + 5),
            list_cache_ttl: Duration::from_secs(config.intake.list_cache_ttl_secs),
            list_cache_capacity: config.intake.list_cache_capacity,
        }
    }
}

impl Default for IntakeSettings {
    fn default() -> Self {
        Self {
            max_upload_bytes: 20 * 1024 * 1024,
            upload_timeout: Duration::from_secs(30),
            prefill_timeout: Duration::from_secs(65),
            list_cache_ttl: Duration::from_secs(30),
            list_cache_capacity: 256,
        }
    }
}
