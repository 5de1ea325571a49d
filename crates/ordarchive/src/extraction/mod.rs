//! Best-effort metadata extraction from scanned orders.
//!
//! An extractor stages the PDF with an external document-understanding
//! service, asks for the order fields as JSON and parses the answer. Any
//! failure is advisory: the user fills the form manually.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod error;
pub mod gemini;
pub mod parse;
pub mod prompt;

pub use error::ExtractionError;
pub use gemini::GeminiExtractor;

use crate::config::ExtractionConfig;
use crate::error::ConfigError;

/// Fields read from a scan. Never persisted; any of them may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub order_number: Option<String>,
    /// `YYYY-MM-DD`.
    pub order_date: Option<String>,
    #[serde(rename = "type")]
    pub order_type: Option<String>,
    pub sub_type: Option<String>,
    pub employee_name: Option<String>,
    pub description: Option<String>,
    pub basis: Option<String>,
}

impl ExtractionResult {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Number of fields the extractor filled in.
    pub fn filled_fields(&self) -> usize {
        [
            &self.order_number,
            &self.order_date,
            &self.order_type,
            &self.sub_type,
            &self.employee_name,
            &self.description,
            &self.basis,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }
}

#[async_trait]
pub trait DocumentExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Extracts order fields from a PDF. `bytes` must not be empty.
    async fn extract(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<ExtractionResult, ExtractionError>;
}

/// Stand-in used when extraction is switched off or has no API key.
pub struct DisabledExtractor;

#[async_trait]
impl DocumentExtractor for DisabledExtractor {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn extract(
        &self,
        _bytes: &[u8],
        _file_name: &str,
    ) -> Result<ExtractionResult, ExtractionError> {
        Err(ExtractionError::Disabled)
    }
}

/// Builds the configured extractor. A missing API key disables extraction
/// rather than failing start-up.
pub fn from_config(config: &ExtractionConfig) -> Result<Arc<dyn DocumentExtractor>, ConfigError> {
    if !config.enabled {
        log::info!("Document extraction disabled by configuration");
        return Ok(Arc::new(DisabledExtractor));
    }

    let api_key = config
        .api_key
        .resolve_optional()
        .map_err(|e| ConfigError::Secret {
            name: "extraction.api_key".to_string(),
            source: e,
        })?;

    match api_key {
        Some(key) => {
            let extractor = GeminiExtractor::new(key, &config.model)
                .map_err(|e| ConfigError::Validation {
                    message: format!("extraction client: {}", e),
                })?
                .with_base_url(&config.base_url)
                .with_organization(&config.organization)
                .with_timeout(std::time::Duration::from_secs(config.timeout_secs));
            log::info!("Document extraction via Gemini model {}", config.model);
            Ok(Arc::new(extractor))
        }
        None => {
            log::warn!("No extraction API key configured; prefill will be unavailable");
            Ok(Arc::new(DisabledExtractor))
        }
    }
}
