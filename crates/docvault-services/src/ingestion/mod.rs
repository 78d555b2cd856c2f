//! Ingestion coordinator: create, replace and delete documents backed by staged uploads.

pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use service::IngestionCoordinator;
pub use types::{
    ChangeStatusRequest, CreateDocumentsRequest, DanglingDocument, DeleteDocumentRequest,
    DocumentItem, ReplaceDocumentRequest,
};
