//! Helpers for sanitizing data before it reaches storage keys or logs.
//!
//! Log lines are safe to share for debugging; these functions ensure no API
//! keys or full document text leak into them.

/// Replaces every character outside `[A-Za-z0-9.]` with `_`.
///
/// Empty names (or names that sanitize to dots only) become `document.pdf`.
pub fn sanitize_file_name(name: &str) -> String {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if sanitized.chars().all(|c| c == '.') {
        "document.pdf".to_string()
    } else {
        sanitized
    }
}

/// Strips the query string (which carries `key=` for the extraction API)
/// and any userinfo from a URL.
///
/// - `https://host/v1/files?key=abc` → `https://host/v1/files`
/// - `https://user:pw@host/a` → `https://****@host/a`
pub fn redact_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or(url);

    if let Some(scheme_end) = without_query.find("://") {
        let after_scheme = &without_query[scheme_end + 3..];
        let authority_end = after_scheme.find('/').unwrap_or(after_scheme.len());
        if let Some(at_pos) = after_scheme[..authority_end].find('@') {
            let scheme = &without_query[..scheme_end + 3];
            let after_at = &after_scheme[at_pos + 1..];
            return format!("{}****@{}", scheme, after_at);
        }
    }

    without_query.to_string()
}

/// Truncates text for log output, respecting char boundaries.
pub fn truncate_for_log(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let truncated: String = text.chars().take(max_chars).collect();
    format!("{}... (truncated)", truncated)
}
