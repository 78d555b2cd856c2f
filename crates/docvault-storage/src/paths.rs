//! Permanent path construction.
//!
//! Everything here is pure apart from [`build_permanent_path`] reading the clock; no
//! function touches the filesystem.

use crate::traits::{StorageError, StorageResult};
use docvault_core::constants::MAX_BASE_NAME_LEN;
use docvault_core::models::Subject;
use docvault_core::validation::file_extension;
use std::path::{Component, Path};
use uuid::Uuid;

/// Split an untrusted file name into a safe base name and a dotted, lower-case extension.
///
/// Directory parts are dropped. A name containing a `..` component is rejected outright.
pub fn sanitize_file_name(original_name: &str) -> StorageResult<(String, String)> {
    let trimmed = original_name.trim();
    if trimmed.split(['/', '\\']).any(|part| part == "..") {
        return Err(StorageError::InvalidPath(format!(
            "File name '{}' contains a parent directory reference",
            original_name
        )));
    }

    let last = trimmed.rsplit(['/', '\\']).next().unwrap_or_default();
    let path = Path::new(last);

    let extension = file_extension(last);

    let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    let mut base: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_BASE_NAME_LEN)
        .collect();
    if base.trim_matches('_').is_empty() {
        base = "file".to_string();
    }

    let extension = if extension.is_empty() {
        String::new()
    } else {
        format!(".{}", extension)
    };

    Ok((base, extension))
}

/// Directory holding every version of one subject's document of one type.
pub fn subject_folder(subject: &Subject, document_type_id: Uuid) -> String {
    format!(
        "{}/{}/{}/{}",
        subject.tenant_id,
        subject.subject_type.as_str(),
        subject.subject_id,
        document_type_id
    )
}

/// Build the permanent relative path using the current wall-clock time.
pub fn build_permanent_path(
    subject: &Subject,
    document_type_id: Uuid,
    version_number: i32,
    original_name: &str,
) -> StorageResult<String> {
    build_permanent_path_at(
        subject,
        document_type_id,
        version_number,
        original_name,
        chrono::Utc::now().timestamp_millis(),
    )
}

/// Build the permanent relative path for an explicit millisecond timestamp.
pub fn build_permanent_path_at(
    subject: &Subject,
    document_type_id: Uuid,
    version_number: i32,
    original_name: &str,
    timestamp_ms: i64,
) -> StorageResult<String> {
    if version_number < 1 {
        return Err(StorageError::InvalidPath(format!(
            "Version number must be positive, got {}",
            version_number
        )));
    }

    let (base, extension) = sanitize_file_name(original_name)?;
    let relative = format!(
        "{}/v{}_{}_{}{}",
        subject_folder(subject, document_type_id),
        version_number,
        timestamp_ms,
        base,
        extension
    );

    let escapes = Path::new(&relative)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)));
    if escapes {
        return Err(StorageError::InvalidPath(format!(
            "Path '{}' resolves outside the document directory",
            relative
        )));
    }

    Ok(relative)
}
