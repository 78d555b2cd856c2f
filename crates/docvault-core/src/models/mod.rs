//! Domain models

pub mod audit;
pub mod document;
pub mod document_type;
pub mod staged;

pub use audit::{AuditAction, AuditLogEntry, NewAuditEntry, StatusTimelineEntry};
pub use document::{
    Document, DocumentStatus, DocumentVersion, FileRef, NewDocument, NewVersion, Subject,
    SubjectType,
};
pub use document_type::{DocumentCategory, DocumentType, NewDocumentCategory, NewDocumentType};
pub use staged::{StagedEntry, StagedFile};
