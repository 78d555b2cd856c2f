//! Error types module
//!
//! This module provides the core error types used throughout Docvault.
//! All errors are unified under the `AppError` enum. Every variant belongs to exactly one
//! [`ErrorKind`] so callers can branch on the taxonomy without matching individual variants.
//!
//! The `Database` variant and `From<sqlx::Error>` are gated behind the `sqlx` feature.

use std::io;

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::Error as SqlxError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for conflicts and recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Top-level error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Promotion,
    Storage,
}

/// A single field-level problem attached to an error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct FieldError {
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Metadata for error responses - defines how an error should be presented
/// This trait allows errors to self-describe their response characteristics
pub trait ErrorMetadata {
    /// HTTP status code to return
    fn http_status_code(&self) -> u16;

    /// Machine-readable error code (e.g., "DOCUMENT_ALREADY_EXISTS")
    fn error_code(&self) -> &'static str;

    /// Whether this error is recoverable (can be retried)
    fn is_recoverable(&self) -> bool;

    /// Suggested action for the client
    fn suggested_action(&self) -> Option<&'static str>;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Whether details should be hidden in production
    fn is_sensitive(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[source] SqlxError),

    #[cfg(not(feature = "sqlx"))]
    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Validation failed: {} field error(s)", .0.len())]
    Validation(Vec<FieldError>),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Staged file not found: {staged_path}")]
    TempFileMissing { staged_path: String },

    #[error("Document type not found: {document_type_id}")]
    DocumentTypeNotFound { document_type_id: Uuid },

    #[error("Extension '{extension}' of '{original_name}' is not allowed for document type '{document_type}'")]
    ExtensionNotAllowed {
        original_name: String,
        extension: String,
        document_type: String,
        allowed: Vec<String>,
    },

    #[error("Document already exists for document type {document_type_id}")]
    DocumentAlreadyExists {
        document_type_id: Uuid,
        document_type: Option<String>,
    },

    #[error("Document not found: {document_id}")]
    DocumentNotFound { document_id: Uuid },

    #[error("Unique constraint violated: {message}")]
    UniqueViolation {
        constraint: Option<String>,
        message: String,
    },

    #[error("Required value missing: {message}")]
    NotNullViolation {
        constraint: Option<String>,
        message: String,
    },

    #[error("Referenced record does not exist: {message}")]
    ForeignKeyViolation {
        constraint: Option<String>,
        message: String,
    },

    #[error("Check constraint violated: {message}")]
    CheckViolation {
        constraint: Option<String>,
        message: String,
    },

    #[error("Promotion of document {document_id} to '{permanent_path}' failed: {reason}")]
    Promotion {
        document_id: Uuid,
        permanent_path: String,
        reason: String,
        /// Documents from the same request whose metadata is already committed.
        committed_document_ids: Vec<Uuid>,
    },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(feature = "sqlx")]
impl From<SqlxError> for AppError {
    fn from(err: SqlxError) -> Self {
        if let SqlxError::Database(ref db_err) = err {
            let constraint = db_err.constraint().map(str::to_string);
            let message = db_err.message().to_string();
            match db_err.kind() {
                sqlx::error::ErrorKind::UniqueViolation => {
                    return AppError::UniqueViolation {
                        constraint,
                        message,
                    }
                }
                sqlx::error::ErrorKind::NotNullViolation => {
                    return AppError::NotNullViolation {
                        constraint,
                        message,
                    }
                }
                sqlx::error::ErrorKind::ForeignKeyViolation => {
                    return AppError::ForeignKeyViolation {
                        constraint,
                        message,
                    }
                }
                sqlx::error::ErrorKind::CheckViolation => {
                    return AppError::CheckViolation {
                        constraint,
                        message,
                    }
                }
                _ => {}
            }
        }
        AppError::Database(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Storage(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let mut fields = Vec::new();
        flatten_validation_errors("", &err, &mut fields);
        if fields.is_empty() {
            fields.push(FieldError::new("", err.to_string()));
        }
        AppError::Validation(fields)
    }
}

fn flatten_validation_errors(
    prefix: &str,
    errors: &validator::ValidationErrors,
    out: &mut Vec<FieldError>,
) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(field_errors) => {
                for e in field_errors {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string());
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten_validation_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    flatten_validation_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

/// Static metadata for each variant: (http_status, error_code, recoverable, suggested_action, sensitive, log_level).
/// Reduces duplication in ErrorMetadata impl; client_message stays per-variant for dynamic content.
fn app_error_static_metadata(
    err: &AppError,
) -> (
    u16,
    &'static str,
    bool,
    Option<&'static str>,
    bool,
    LogLevel,
) {
    match err {
        AppError::Database(_) => (
            500,
            "DATABASE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::Storage(_) => (
            500,
            "STORAGE_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InvalidInput(_) => (
            400,
            "INVALID_INPUT",
            false,
            Some("Check request parameters and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Validation(_) => (
            400,
            "VALIDATION_ERROR",
            false,
            Some("Fix the listed fields and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::NotFound(_) => (
            404,
            "NOT_FOUND",
            false,
            Some("Verify the resource ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::TempFileMissing { .. } => (
            400,
            "TEMP_FILE_MISSING",
            false,
            Some("Upload the file again before submitting"),
            false,
            LogLevel::Debug,
        ),
        AppError::DocumentTypeNotFound { .. } => (
            404,
            "DOCUMENT_TYPE_NOT_FOUND",
            false,
            Some("Verify the document type ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::ExtensionNotAllowed { .. } => (
            400,
            "EXTENSION_NOT_ALLOWED",
            false,
            Some("Upload a file with one of the allowed extensions"),
            false,
            LogLevel::Debug,
        ),
        AppError::DocumentAlreadyExists { .. } => (
            409,
            "DOCUMENT_ALREADY_EXISTS",
            false,
            Some("Replace the existing document instead of creating a new one"),
            false,
            LogLevel::Warn,
        ),
        AppError::DocumentNotFound { .. } => (
            404,
            "DOCUMENT_NOT_FOUND",
            false,
            Some("Verify the document ID exists"),
            false,
            LogLevel::Debug,
        ),
        AppError::UniqueViolation { .. } => (
            409,
            "UNIQUE_VIOLATION",
            false,
            Some("A record with these values already exists"),
            false,
            LogLevel::Warn,
        ),
        AppError::NotNullViolation { .. } => (
            400,
            "NOT_NULL_VIOLATION",
            false,
            Some("Provide all required fields"),
            false,
            LogLevel::Debug,
        ),
        AppError::ForeignKeyViolation { .. } => (
            400,
            "FOREIGN_KEY_VIOLATION",
            false,
            Some("Verify referenced records exist"),
            false,
            LogLevel::Debug,
        ),
        AppError::CheckViolation { .. } => (
            400,
            "CHECK_VIOLATION",
            false,
            Some("Check field values and try again"),
            false,
            LogLevel::Debug,
        ),
        AppError::Promotion { .. } => (
            500,
            "PROMOTION_FAILED",
            false,
            Some("Contact support; the document needs manual repair"),
            true,
            LogLevel::Error,
        ),
        AppError::Internal(_) => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
        AppError::InternalWithSource { .. } => (
            500,
            "INTERNAL_ERROR",
            true,
            Some("Retry after a short delay"),
            true,
            LogLevel::Error,
        ),
    }
}

impl AppError {
    /// Classify this error into the top-level taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::InvalidInput(_)
            | AppError::Validation(_)
            | AppError::TempFileMissing { .. }
            | AppError::ExtensionNotAllowed { .. }
            | AppError::NotNullViolation { .. }
            | AppError::ForeignKeyViolation { .. }
            | AppError::CheckViolation { .. } => ErrorKind::Validation,
            AppError::NotFound(_)
            | AppError::DocumentTypeNotFound { .. }
            | AppError::DocumentNotFound { .. } => ErrorKind::NotFound,
            AppError::DocumentAlreadyExists { .. } | AppError::UniqueViolation { .. } => {
                ErrorKind::Conflict
            }
            AppError::Promotion { .. } => ErrorKind::Promotion,
            AppError::Database(_)
            | AppError::Storage(_)
            | AppError::Internal(_)
            | AppError::InternalWithSource { .. } => ErrorKind::Storage,
        }
    }

    /// Get the error type name for detailed error responses
    pub fn error_type(&self) -> &str {
        match self {
            AppError::Database(_) => "Database",
            AppError::Storage(_) => "Storage",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Validation(_) => "Validation",
            AppError::NotFound(_) => "NotFound",
            AppError::TempFileMissing { .. } => "TempFileMissing",
            AppError::DocumentTypeNotFound { .. } => "DocumentTypeNotFound",
            AppError::ExtensionNotAllowed { .. } => "ExtensionNotAllowed",
            AppError::DocumentAlreadyExists { .. } => "DocumentAlreadyExists",
            AppError::DocumentNotFound { .. } => "DocumentNotFound",
            AppError::UniqueViolation { .. } => "UniqueViolation",
            AppError::NotNullViolation { .. } => "NotNullViolation",
            AppError::ForeignKeyViolation { .. } => "ForeignKeyViolation",
            AppError::CheckViolation { .. } => "CheckViolation",
            AppError::Promotion { .. } => "Promotion",
            AppError::Internal(_) => "Internal",
            AppError::InternalWithSource { .. } => "Internal",
        }
    }

    /// Name of the violated database constraint, if this is a constraint error.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            AppError::UniqueViolation { constraint, .. }
            | AppError::NotNullViolation { constraint, .. }
            | AppError::ForeignKeyViolation { constraint, .. }
            | AppError::CheckViolation { constraint, .. } => constraint.as_deref(),
            _ => None,
        }
    }

    /// Field-level details for the response body
    pub fn field_errors(&self) -> Vec<FieldError> {
        match self {
            AppError::Validation(fields) => fields.clone(),
            AppError::InvalidInput(msg) => vec![FieldError::new("", msg.clone())],
            AppError::TempFileMissing { staged_path } => vec![FieldError::new(
                "staged_path",
                format!("Staged file '{}' does not exist", staged_path),
            )],
            AppError::DocumentTypeNotFound { document_type_id } => vec![FieldError::new(
                "document_type_id",
                format!("Document type {} does not exist", document_type_id),
            )],
            AppError::ExtensionNotAllowed { .. } => {
                vec![FieldError::new("original_name", self.client_message())]
            }
            AppError::DocumentAlreadyExists { .. } => {
                vec![FieldError::new("document_type_id", self.client_message())]
            }
            AppError::DocumentNotFound { document_id } => vec![FieldError::new(
                "document_id",
                format!("Document {} does not exist", document_id),
            )],
            AppError::NotNullViolation { message, .. }
            | AppError::ForeignKeyViolation { message, .. }
            | AppError::CheckViolation { message, .. } => {
                vec![FieldError::new("", message.clone())]
            }
            _ => Vec::new(),
        }
    }

    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn http_status_code(&self) -> u16 {
        app_error_static_metadata(self).0
    }

    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).1
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).2
    }

    fn suggested_action(&self) -> Option<&'static str> {
        app_error_static_metadata(self).3
    }

    fn is_sensitive(&self) -> bool {
        app_error_static_metadata(self).4
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).5
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Database(_) => "Failed to access database".to_string(),
            AppError::Storage(_) => "Failed to access storage".to_string(),
            AppError::InvalidInput(ref msg) => msg.clone(),
            AppError::Validation(ref fields) => match fields.first() {
                Some(first) if fields.len() == 1 => first.message.clone(),
                _ => format!("{} fields failed validation", fields.len()),
            },
            AppError::NotFound(ref msg) => msg.clone(),
            AppError::TempFileMissing { .. } => {
                "Uploaded file not found; it may have expired".to_string()
            }
            AppError::DocumentTypeNotFound { document_type_id } => {
                format!("Document type {} not found", document_type_id)
            }
            AppError::ExtensionNotAllowed {
                original_name,
                extension,
                document_type,
                allowed,
            } => format!(
                "File '{}' has extension '.{}' which is not allowed for '{}'. Allowed: {}",
                original_name,
                extension,
                document_type,
                allowed.join(", ")
            ),
            AppError::DocumentAlreadyExists {
                document_type,
                document_type_id,
            } => match document_type {
                Some(name) => format!("A document of type '{}' already exists", name),
                None => format!(
                    "A document of type {} already exists",
                    document_type_id
                ),
            },
            AppError::DocumentNotFound { .. } => "Document not found".to_string(),
            AppError::UniqueViolation { .. } => "Record already exists".to_string(),
            AppError::NotNullViolation { .. } => "Required field is missing".to_string(),
            AppError::ForeignKeyViolation { .. } => {
                "Referenced record does not exist".to_string()
            }
            AppError::CheckViolation { .. } => "Invalid field value".to_string(),
            AppError::Promotion { document_id, .. } => format!(
                "Document {} was recorded but its file could not be stored",
                document_id
            ),
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::InternalWithSource { .. } => "Internal server error".to_string(),
        }
    }
}
