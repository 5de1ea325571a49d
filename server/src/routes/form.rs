//! Reading order submissions from multipart and urlencoded bodies.

use axum::extract::{FromRequest, Multipart, Request};
use axum::http::header::CONTENT_TYPE;
use axum::Form;

use ordarchive::{OrderInput, UploadedFile};

use crate::error::ApiError;

pub const FIELD_PDF_FILE: &str = "pdfFile";

/// Collects the order fields of a multipart form. Unknown fields are
/// skipped; the scan is read from `pdfFile`.
pub async fn read_order_multipart(mut multipart: Multipart) -> Result<OrderInput, ApiError> {
    let mut input = OrderInput::default();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };

        if name == FIELD_PDF_FILE {
            let file_name = field.file_name().unwrap_or("document.pdf").to_string();
            let content_type = field.content_type().map(str::to_string);
            let bytes = field.bytes().await?;
            let mut file = UploadedFile::new(file_name, bytes.to_vec());
            file.content_type = content_type;
            input.file = Some(file);
            continue;
        }

        let slot = match name.as_str() {
            "orderNumber" => &mut input.order_number,
            "orderDate" => &mut input.order_date,
            "type" => &mut input.order_type,
            "subType" => &mut input.sub_type,
            "employeeName" => &mut input.employee_name,
            "description" => &mut input.description,
            "basis" => &mut input.basis,
            "pdfUrl" => &mut input.pdf_url,
            _ => {
                tracing::debug!(field = %name, "ignoring unknown form field");
                continue;
            }
        };
        *slot = Some(field.text().await?);
    }

    Ok(input)
}

/// Reads a metadata submission sent either as multipart or urlencoded form.
pub async fn read_order_form(request: Request) -> Result<OrderInput, ApiError> {
    let is_multipart = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"));

    if is_multipart {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        read_order_multipart(multipart).await
    } else {
        let Form(input) = Form::<OrderInput>::from_request(request, &())
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?;
        Ok(input)
    }
}
