//! Database repositories for data access layer
//!
//! `document` owns the documents table and everything appended alongside it (versions,
//! audit log, status timeline). `document_type` owns the category/type catalog.
//
// Document repository (metadata transactions)
pub mod document;
//
// Document category and type catalog
pub mod document_type;
//
// Transaction utilities
pub mod transaction;
//
pub use document::DocumentRepository;
pub use document_type::{DocumentCategoryRepository, DocumentTypeRepository};
