//! Docvault Services Layer
//!
//! Orchestration on top of storage and the database: the ingestion coordinator, the
//! staging sweeper, upload staging with virus scanning, and checklist sync with the
//! user service.

pub mod checklist;
#[cfg(feature = "cleanup")]
pub mod cleanup;
pub mod ingestion;
pub mod services;
pub mod upload;

pub use checklist::{build_checklist, to_camel_case, ChecklistSyncService};
#[cfg(feature = "cleanup")]
pub use cleanup::{OrphanSweeper, SweepStats};
pub use ingestion::{
    ChangeStatusRequest, CreateDocumentsRequest, DanglingDocument, DeleteDocumentRequest,
    DocumentItem, IngestionCoordinator, ReplaceDocumentRequest,
};
#[cfg(feature = "clamav")]
pub use services::ClamAVService;
pub use services::{ScanResult, VirusScanner};
pub use upload::UploadService;

// Test helpers (only available in test mode)
#[cfg(test)]
pub mod test_helpers;
