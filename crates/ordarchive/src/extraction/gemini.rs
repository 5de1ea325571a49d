//! Google Gemini client: Files API upload plus `generateContent`.

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info_span, warn, Instrument};

use super::parse::parse_response;
use super::prompt::build_prompt;
use super::{DocumentExtractor, ExtractionError, ExtractionResult};
use crate::document::PDF_MIME_TYPE;
use crate::sanitize::{redact_url, sanitize_file_name, truncate_for_log};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_ORGANIZATION: &str = "ТОО «Астана-Зеленстрой»";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
/// Budget for deleting the remote file once the main deadline is spent.
const CLEANUP_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Deserialize)]
struct UploadedFileEnvelope {
    file: RemoteFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RemoteFile {
    /// `files/{id}`, used for deletion.
    name: String,
    uri: String,
    #[serde(default)]
    mime_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "responseMimeType")]
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

/// Extractor backed by the Gemini API.
///
/// Each call stages the PDF in a local temp file, uploads it to the Files
/// API, runs one `generateContent` request and deletes the remote file
/// again. The local temp file is removed on every exit path.
pub struct GeminiExtractor {
    client: reqwest::Client,
    base_url: String,
    model: String,
    organization: String,
    timeout: Duration,
    max_retries: u32,
    retry_delay: Duration,
    staging_dir: Option<PathBuf>,
}

impl GeminiExtractor {
    pub fn new(api_key: SecretString, model: &str) -> Result<Self, ExtractionError> {
        let mut key = HeaderValue::from_str(api_key.expose_secret()).map_err(|e| {
            ExtractionError::Upload {
                reason: format!("invalid API key header value: {}", e),
            }
        })?;
        key.set_sensitive(true);
        let mut headers = HeaderMap::new();
        headers.insert("x-goog-api-key", key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.to_string(),
            organization: DEFAULT_ORGANIZATION.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: 1,
            retry_delay: Duration::from_secs(1),
            staging_dir: None,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_organization(mut self, organization: &str) -> Self {
        self.organization = organization.to_string();
        self
    }

    /// Bounds upload plus generation. Remote cleanup gets its own short
    /// budget on top.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Stages temp files in `dir` instead of the system temp directory.
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }

    #[cfg(test)]
    fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Writes the document to a temp file that is deleted when dropped.
    fn stage(&self, bytes: &[u8], file_name: &str) -> Result<tempfile::NamedTempFile, ExtractionError> {
        let prefix = format!("ordarchive-{}-", sanitize_file_name(file_name));
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".upload");
        let mut staged = match &self.staging_dir {
            Some(dir) => builder.tempfile_in(dir),
            None => builder.tempfile(),
        }
        .map_err(ExtractionError::Staging)?;
        staged.write_all(bytes).map_err(ExtractionError::Staging)?;
        staged.flush().map_err(ExtractionError::Staging)?;
        Ok(staged)
    }

    /// Resumable upload: a start request hands out a session URL, a second
    /// request sends the bytes and finalizes.
    async fn upload(&self, staged: &tempfile::NamedTempFile, display_name: &str) -> Result<RemoteFile, ExtractionError> {
        let bytes = tokio::fs::read(staged.path())
            .await
            .map_err(ExtractionError::Staging)?;

        let start = self
            .client
            .post(format!("{}/upload/v1beta/files", self.base_url))
            .header("X-Goog-Upload-Protocol", "resumable")
            .header("X-Goog-Upload-Command", "start")
            .header("X-Goog-Upload-Header-Content-Length", bytes.len().to_string())
            .header("X-Goog-Upload-Header-Content-Type", PDF_MIME_TYPE)
            .header(CONTENT_TYPE, "application/json")
            .json(&json!({ "file": { "display_name": display_name } }))
            .send()
            .await?;

        let status = start.status();
        if !status.is_success() {
            return Err(provider_error(status, start).await);
        }
        let session_url = start
            .headers()
            .get("x-goog-upload-url")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| ExtractionError::Upload {
                reason: "no upload URL in start response".to_string(),
            })?;
        debug!(url = %redact_url(&session_url), "upload session opened");

        let finish = self
            .client
            .post(&session_url)
            .header("X-Goog-Upload-Offset", "0")
            .header("X-Goog-Upload-Command", "upload, finalize")
            .body(bytes)
            .send()
            .await?;

        let status = finish.status();
        if !status.is_success() {
            return Err(provider_error(status, finish).await);
        }
        let envelope: UploadedFileEnvelope =
            finish.json().await.map_err(|e| ExtractionError::Upload {
                reason: format!("unexpected upload response: {}", e),
            })?;
        Ok(envelope.file)
    }

    /// Runs `generateContent`, retrying once on transient statuses.
    async fn generate(&self, file: &RemoteFile) -> Result<String, ExtractionError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![
                    json!({ "text": build_prompt(&self.organization) }),
                    json!({
                        "file_data": {
                            "mime_type": file.mime_type.as_deref().unwrap_or(PDF_MIME_TYPE),
                            "file_uri": file.uri,
                        }
                    }),
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                response_mime_type: "application/json",
            },
        };

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying generateContent after transient error");
                tokio::time::sleep(self.retry_delay).await;
            }

            let response = self.client.post(&url).json(&request).send().await?;
            let status = response.status();
            debug!(status = %status, attempt, "generateContent response received");

            if status.is_success() {
                let body: GenerateResponse = response.json().await?;
                return collect_text(body);
            }

            let err = provider_error(status, response).await;
            if is_transient_error(status) && attempt < self.max_retries {
                warn!(error = %err, "transient error, will retry");
                last_error = Some(err);
                continue;
            }
            return Err(err);
        }

        Err(last_error.unwrap_or(ExtractionError::EmptyResponse))
    }

    /// Deletes the remote copy. Failures are only logged; the provider
    /// expires uploaded files on its own.
    async fn delete_remote(&self, file: &RemoteFile) {
        let url = format!("{}/v1beta/{}", self.base_url, file.name);
        let request = self.client.delete(&url).timeout(CLEANUP_TIMEOUT).send();
        match request.await {
            Ok(r) if r.status().is_success() => debug!(file = %file.name, "remote file deleted"),
            Ok(r) => warn!(file = %file.name, status = %r.status(), "remote file not deleted"),
            Err(e) => warn!(file = %file.name, error = %e, "remote file not deleted"),
        }
    }

    async fn run(&self, bytes: &[u8], file_name: &str) -> Result<ExtractionResult, ExtractionError> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let staged = self.stage(bytes, file_name)?;
        let remote = tokio::time::timeout_at(deadline, self.upload(&staged, file_name))
            .await
            .map_err(|_| ExtractionError::Timeout(self.timeout))??;
        // The local copy is not needed past the upload.
        drop(staged);

        // Once the remote file exists it is deleted on every path, timeout
        // included.
        let generated = tokio::time::timeout_at(deadline, self.generate(&remote))
            .await
            .unwrap_or(Err(ExtractionError::Timeout(self.timeout)));
        self.delete_remote(&remote).await;

        let text = generated?;
        debug!(answer = %truncate_for_log(&text, 200), "model answered");
        parse_response(&text)
    }
}

#[async_trait]
impl DocumentExtractor for GeminiExtractor {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn extract(
        &self,
        bytes: &[u8],
        file_name: &str,
    ) -> Result<ExtractionResult, ExtractionError> {
        if bytes.is_empty() {
            return Err(ExtractionError::EmptyInput);
        }

        let span = info_span!("extract", model = %self.model, size = bytes.len());
        self.run(bytes, file_name).instrument(span).await
    }
}

fn collect_text(body: GenerateResponse) -> Result<String, ExtractionError> {
    let text: String = body
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ExtractionError::EmptyResponse);
    }
    Ok(text)
}

async fn provider_error(status: StatusCode, response: reqwest::Response) -> ExtractionError {
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorResponse>(&body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| truncate_for_log(&body, 200));
    ExtractionError::Provider {
        status: status.as_u16(),
        message,
    }
}

/// Returns true for HTTP status codes that indicate transient errors worth retrying.
fn is_transient_error(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}
