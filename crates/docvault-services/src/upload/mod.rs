//! Caller-side staging of uploaded bytes.
//!
//! Uploads are size-checked, written to the staging area and scanned before their staged
//! name is handed out. Nothing here touches the database.

use crate::services::{ScanResult, VirusScanner};
use docvault_core::models::StagedFile;
use docvault_core::{AppError, FieldError};
use docvault_storage::{DiscardSummary, StagingStore};
use std::sync::Arc;

#[derive(Clone)]
pub struct UploadService {
    staging: StagingStore,
    scanner: Option<Arc<dyn VirusScanner>>,
    max_file_size_bytes: u64,
}

impl UploadService {
    pub fn new(
        staging: StagingStore,
        scanner: Option<Arc<dyn VirusScanner>>,
        max_file_size_bytes: u64,
    ) -> Self {
        Self {
            staging,
            scanner,
            max_file_size_bytes,
        }
    }

    pub fn staging(&self) -> &StagingStore {
        &self.staging
    }

    #[tracing::instrument(skip(self, data), fields(original_name = %original_name, size = data.len()))]
    pub async fn stage_upload(
        &self,
        original_name: &str,
        data: &[u8],
    ) -> Result<StagedFile, AppError> {
        if original_name.trim().is_empty() {
            return Err(AppError::Validation(vec![FieldError::new(
                "originalName",
                "must not be empty",
            )]));
        }
        if data.len() as u64 > self.max_file_size_bytes {
            return Err(AppError::InvalidInput(format!(
                "File '{}' is {} bytes, which exceeds the maximum of {} bytes",
                original_name,
                data.len(),
                self.max_file_size_bytes
            )));
        }

        let staged = self.staging.stage(data, original_name).await?;

        let Some(scanner) = &self.scanner else {
            return Ok(staged);
        };

        let path = self.staging.resolve(&staged.staged_path)?;
        match scanner.scan_file(&path).await {
            ScanResult::Clean => Ok(staged),
            ScanResult::Infected(viruses) => {
                self.discard_quietly(&staged.staged_path).await;
                tracing::warn!(
                    staged_path = %staged.staged_path,
                    viruses = ?viruses,
                    "Rejected infected upload"
                );
                Err(AppError::Validation(vec![FieldError::new(
                    "file",
                    format!(
                        "File '{}' is infected: {}",
                        original_name,
                        viruses.join(", ")
                    ),
                )]))
            }
            ScanResult::Error(message) => {
                self.discard_quietly(&staged.staged_path).await;
                Err(AppError::Storage(format!("Virus scan failed: {}", message)))
            }
        }
    }

    /// Best-effort bulk discard of staged uploads the caller no longer needs.
    pub async fn discard_uploads<S: AsRef<str>>(&self, staged_paths: &[S]) -> DiscardSummary {
        let summary = self.staging.discard_many(staged_paths).await;
        tracing::info!(
            deleted = summary.deleted_count,
            failed = summary.failed_count,
            "Discarded staged uploads"
        );
        summary
    }

    async fn discard_quietly(&self, staged_path: &str) {
        if let Err(e) = self.staging.discard(staged_path).await {
            tracing::warn!(error = %e, staged_path = %staged_path, "Failed to discard staged upload");
        }
    }
}
