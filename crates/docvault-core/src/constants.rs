//! Shared constants

/// Maximum number of documents accepted in one create request.
pub const MAX_DOCUMENTS_PER_REQUEST: u64 = 10;

/// Maximum length of the sanitized base name kept in stored file names.
pub const MAX_BASE_NAME_LEN: usize = 50;

/// Maximum length of a stored file extension, without the dot.
pub const MAX_EXTENSION_LEN: usize = 10;

/// Default upper bound for a single staged upload (5 MiB).
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 5 * 1024 * 1024;

/// Name of the partial unique index guarding one active document per subject and type.
pub const ACTIVE_DOCUMENT_UNIQUE_INDEX: &str = "documents_active_subject_type_uniq";

/// Name of the unique index guarding version numbers per document.
pub const VERSION_NUMBER_UNIQUE_INDEX: &str = "document_versions_document_version_uniq";
