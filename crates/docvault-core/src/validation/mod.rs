//! Validation helpers shared by the storage and ingestion layers

use crate::constants::MAX_EXTENSION_LEN;
use std::path::Path;

/// Extension of `file_name` without the dot: ASCII alphanumerics only, lower-cased, at most
/// `MAX_EXTENSION_LEN` characters. Empty when absent.
///
/// This is the extension that is validated, stored and written to the permanent path.
pub fn file_extension(file_name: &str) -> String {
    let last = file_name.trim().rsplit(['/', '\\']).next().unwrap_or_default();
    Path::new(last)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(MAX_EXTENSION_LEN)
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Normalize an allow-list entry: trim, drop a leading dot, lower-case.
pub fn normalize_extension(extension: &str) -> String {
    extension.trim().trim_start_matches('.').to_lowercase()
}

/// Case-insensitive allow-list check. An empty list accepts everything; a file without an
/// extension is rejected by any non-empty list.
pub fn is_extension_allowed(allowed: &[String], extension: &str) -> bool {
    if allowed.is_empty() {
        return true;
    }
    let extension = normalize_extension(extension);
    if extension.is_empty() {
        return false;
    }
    allowed
        .iter()
        .any(|candidate| normalize_extension(candidate) == extension)
}
