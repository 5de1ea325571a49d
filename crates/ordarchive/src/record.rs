//! Archive record model.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::taxonomy::OrderType;

/// A persisted archive entry describing one scanned order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveRecord {
    pub id: String,
    pub order_number: String,
    /// Day-granularity date, serialized as `YYYY-MM-DD`.
    pub order_date: NaiveDate,
    /// Taxonomy label of the order type.
    #[serde(rename = "type")]
    pub order_type: String,
    pub sub_type: Option<String>,
    pub employee_name: Option<String>,
    pub description: Option<String>,
    pub basis: Option<String>,
    pub pdf_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A PDF as received from a client.
#[derive(Clone, Default)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for UploadedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadedFile")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// Raw order submission, exactly as the form delivered it.
///
/// Every field is optional here; the validator decides what is required.
/// `pdf_url` is accepted so that clients echoing a full record do not fail,
/// but it is never applied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderInput {
    pub order_number: Option<String>,
    pub order_date: Option<String>,
    #[serde(rename = "type")]
    pub order_type: Option<String>,
    pub sub_type: Option<String>,
    pub employee_name: Option<String>,
    pub description: Option<String>,
    pub basis: Option<String>,
    pub pdf_url: Option<String>,
    #[serde(skip)]
    pub file: Option<UploadedFile>,
}

/// Metadata that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRecord {
    pub order_number: String,
    pub order_date: NaiveDate,
    pub order_type: OrderType,
    pub sub_type: Option<String>,
    pub employee_name: Option<String>,
    pub description: Option<String>,
    pub basis: Option<String>,
}

/// A create submission that passed validation: metadata plus its scan.
#[derive(Debug, Clone)]
pub struct ValidatedSubmission {
    pub record: ValidatedRecord,
    pub file: UploadedFile,
}

/// Filter for archive listings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct OrderFilter {
    /// Case-insensitive substring searched in order number, type, employee
    /// name, description and basis.
    pub query: Option<String>,
}

impl OrderFilter {
    pub fn search(query: impl Into<String>) -> Self {
        Self {
            query: Some(query.into()),
        }
    }

    /// The search term, or `None` when the filter matches everything.
    /// Only an empty query means "no filter"; whitespace is part of the term.
    pub fn term(&self) -> Option<&str> {
        self.query.as_deref().filter(|q| !q.is_empty())
    }
}
