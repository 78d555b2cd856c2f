use docvault_storage::StagingStore;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::time::interval;

/// Counters from one sweep of the staging area.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepStats {
    pub total_files: usize,
    pub deleted_files: usize,
    pub failed_files: usize,
    pub freed_bytes: u64,
}

/// Removes staged files that were never claimed by an ingestion.
#[derive(Clone)]
pub struct OrphanSweeper {
    staging: StagingStore,
    max_age: Duration,
}

impl OrphanSweeper {
    pub fn new(staging: StagingStore, max_age: Duration) -> Self {
        Self { staging, max_age }
    }

    /// Start the background sweep task.
    /// Returns a JoinHandle for graceful shutdown
    pub fn start(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut sweep_interval = interval(every);

            loop {
                sweep_interval.tick().await;

                tracing::info!("Starting scheduled sweep of staged files");

                match self.sweep().await {
                    Ok(stats) => tracing::info!(
                        total = stats.total_files,
                        deleted = stats.deleted_files,
                        failed = stats.failed_files,
                        freed_bytes = stats.freed_bytes,
                        "Sweep completed"
                    ),
                    Err(e) => tracing::error!(error = %e, "Sweep task failed"),
                }
            }
        })
    }

    /// Delete staged files at or beyond the maximum age. Directories are left alone and a
    /// file that cannot be removed is counted and skipped.
    #[tracing::instrument(skip(self), fields(cleanup.operation = "sweep_staging"))]
    pub async fn sweep(&self) -> Result<SweepStats, anyhow::Error> {
        let entries = self.staging.list().await?;
        let now = SystemTime::now();
        let mut stats = SweepStats::default();

        for entry in entries.into_iter().filter(|e| e.is_file) {
            stats.total_files += 1;

            // Clock skew can put mtime in the future; such files are young.
            let age = now.duration_since(entry.modified).unwrap_or_default();
            if age < self.max_age {
                continue;
            }

            match self.staging.discard(&entry.name).await {
                Ok(true) => {
                    tracing::debug!(
                        name = %entry.name,
                        age_secs = age.as_secs(),
                        "Deleted orphaned staged file"
                    );
                    stats.deleted_files += 1;
                    stats.freed_bytes += entry.size;
                }
                // Claimed or removed between listing and now.
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(error = %e, name = %entry.name, "Failed to delete staged file");
                    stats.failed_files += 1;
                }
            }
        }

        Ok(stats)
    }
}
