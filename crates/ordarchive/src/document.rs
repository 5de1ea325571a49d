//! Light inspection of uploaded PDFs.

/// PDF signature. Readers tolerate up to 1 KiB of leading garbage.
const PDF_MAGIC: &[u8] = b"%PDF-";
const MAGIC_SEARCH_WINDOW: usize = 1024;

pub const PDF_MIME_TYPE: &str = "application/pdf";

/// Returns true when the payload carries a PDF header.
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    let window = &bytes[..bytes.len().min(MAGIC_SEARCH_WINDOW)];
    window
        .windows(PDF_MAGIC.len())
        .any(|w| w == PDF_MAGIC)
}

/// Counts pages with lopdf. Returns `None` for documents lopdf cannot parse;
/// scans from office copiers often have broken xref tables and are still
/// archived.
pub fn page_count(bytes: &[u8]) -> Option<usize> {
    match lopdf::Document::load_mem(bytes) {
        Ok(doc) => Some(doc.get_pages().len()),
        Err(e) => {
            tracing::debug!("lopdf could not parse upload: {}", e);
            None
        }
    }
}

/// Content type to store the blob under, derived from the file name.
pub fn content_type_for(file_name: &str, declared: Option<&str>) -> String {
    if let Some(declared) = declared.filter(|d| !d.trim().is_empty()) {
        return declared.to_string();
    }
    mime_guess::from_path(file_name)
        .first()
        .map(|m| m.essence_str().to_string())
        .unwrap_or_else(|| PDF_MIME_TYPE.to_string())
}
