//! Docvault Database Layer
//!
//! This crate provides the repositories behind document ingestion: documents with their
//! versions, audit log and status timeline, plus the document-type catalog.

// Module declarations
pub mod db;
pub mod repository_traits;
pub mod setup;

// Re-exports: Repositories
pub use db::{DocumentCategoryRepository, DocumentRepository, DocumentTypeRepository};

// Re-exports: Transaction utilities
pub use db::transaction::with_transaction;

// Re-exports: Repository traits
pub use repository_traits::{DocumentStore, DocumentTypeLookup};

// Re-exports: Pool and migrations
pub use setup::{connect, run_migrations, MIGRATOR};
