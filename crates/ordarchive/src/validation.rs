//! Submission validation and normalisation.
//!
//! Create and update share the metadata rules; create additionally needs the
//! scan itself. All offending fields are reported together so the form can
//! highlight them at once.

use chrono::{DateTime, NaiveDate};

use crate::document;
use crate::error::{FieldIssue, ValidationError};
use crate::record::{OrderInput, UploadedFile, ValidatedRecord, ValidatedSubmission};
use crate::taxonomy::OrderType;

pub const FIELD_PDF_FILE: &str = "pdfFile";
pub const FIELD_ORDER_NUMBER: &str = "orderNumber";
pub const FIELD_ORDER_DATE: &str = "orderDate";
pub const FIELD_TYPE: &str = "type";
pub const FIELD_SUB_TYPE: &str = "subType";

/// Validates a create submission: metadata plus a non-empty PDF no larger
/// than `max_file_bytes`.
pub fn validate_for_create(
    input: OrderInput,
    max_file_bytes: usize,
) -> Result<ValidatedSubmission, ValidationError> {
    let mut issues = Vec::new();

    let file = check_file(input.file.as_ref(), max_file_bytes, &mut issues);
    let record = check_metadata(&input, &mut issues);

    match (record, file) {
        (Some(record), Some(())) if issues.is_empty() => Ok(ValidatedSubmission {
            record,
            file: input.file.unwrap_or_default(),
        }),
        _ => Err(ValidationError::new(issues)),
    }
}

/// Validates an update submission. The file and `pdf_url` are ignored.
pub fn validate_for_update(input: &OrderInput) -> Result<ValidatedRecord, ValidationError> {
    let mut issues = Vec::new();
    match check_metadata(input, &mut issues) {
        Some(record) if issues.is_empty() => Ok(record),
        _ => Err(ValidationError::new(issues)),
    }
}

fn check_file(
    file: Option<&UploadedFile>,
    max_file_bytes: usize,
    issues: &mut Vec<FieldIssue>,
) -> Option<()> {
    let file = match file {
        Some(f) if !f.is_empty() => f,
        _ => {
            issues.push(FieldIssue::missing(FIELD_PDF_FILE));
            return None;
        }
    };
    if file.len() > max_file_bytes {
        issues.push(FieldIssue::invalid(
            FIELD_PDF_FILE,
            format!("exceeds the {} byte limit", max_file_bytes),
        ));
        return None;
    }
    if !document::looks_like_pdf(&file.bytes) {
        issues.push(FieldIssue::invalid(FIELD_PDF_FILE, "is not a PDF document"));
        return None;
    }
    Some(())
}

fn check_metadata(input: &OrderInput, issues: &mut Vec<FieldIssue>) -> Option<ValidatedRecord> {
    let order_number = normalize(input.order_number.as_deref());
    if order_number.is_none() {
        issues.push(FieldIssue::missing(FIELD_ORDER_NUMBER));
    }

    let order_date = match normalize(input.order_date.as_deref()) {
        None => {
            issues.push(FieldIssue::missing(FIELD_ORDER_DATE));
            None
        }
        Some(raw) => match parse_order_date(&raw) {
            Some(date) => Some(date),
            None => {
                issues.push(FieldIssue::invalid(
                    FIELD_ORDER_DATE,
                    format!("'{}' is not a valid calendar date", raw),
                ));
                None
            }
        },
    };

    let order_type = match normalize(input.order_type.as_deref()) {
        None => {
            issues.push(FieldIssue::missing(FIELD_TYPE));
            None
        }
        Some(raw) => match OrderType::parse(&raw) {
            Some(t) => Some(t),
            None => {
                issues.push(FieldIssue::invalid(
                    FIELD_TYPE,
                    format!("'{}' is not a known order type", raw),
                ));
                None
            }
        },
    };

    let sub_type = match (order_type, normalize(input.sub_type.as_deref())) {
        (_, None) => None,
        (Some(t), Some(raw)) => match t.canonical_sub_type(&raw) {
            Some(canonical) => Some(canonical.to_string()),
            None => {
                issues.push(FieldIssue::invalid(
                    FIELD_SUB_TYPE,
                    format!("'{}' is not a sub-type of '{}'", raw, t.label()),
                ));
                None
            }
        },
        // The type itself is already reported.
        (None, Some(_)) => None,
    };

    Some(ValidatedRecord {
        order_number: order_number?,
        order_date: order_date?,
        order_type: order_type?,
        sub_type,
        employee_name: normalize(input.employee_name.as_deref()),
        description: normalize(input.description.as_deref()),
        basis: normalize(input.basis.as_deref()),
    })
}

/// Trims a form value; blank values count as absent.
pub fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parses `YYYY-MM-DD`, `DD.MM.YYYY` or an RFC 3339 timestamp into a
/// calendar date.
pub fn parse_order_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d.%m.%Y"))
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.date_naive())
        })
}
