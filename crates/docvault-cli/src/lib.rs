//! Shared wiring for the docvault operator binary.

use anyhow::Context;
use docvault_core::Config;
use docvault_db::{DocumentRepository, DocumentTypeRepository};
use docvault_services::{
    ChecklistSyncService, ClamAVService, IngestionCoordinator, OrphanSweeper, UploadService,
    VirusScanner,
};
use docvault_storage::{PermanentStorage, StagingStore};
use serde::Serialize;
use sqlx::PgPool;
use std::sync::Arc;

/// Initialize tracing for CLI binaries.
pub fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

pub fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize output")?;
    println!("{}", out);
    Ok(())
}

pub async fn staging_store(config: &Config) -> anyhow::Result<StagingStore> {
    StagingStore::new(config.temp_dir())
        .await
        .context("Failed to open staging directory")
}

pub async fn build_sweeper(config: &Config) -> anyhow::Result<OrphanSweeper> {
    let staging = staging_store(config).await?;
    Ok(OrphanSweeper::new(staging, config.temp_cleanup().max_age))
}

pub async fn build_upload_service(config: &Config) -> anyhow::Result<UploadService> {
    let staging = staging_store(config).await?;
    let scan = config.virus_scan();
    let scanner = scan
        .enabled
        .then(|| Arc::new(ClamAVService::from_config(scan)) as Arc<dyn VirusScanner>);
    Ok(UploadService::new(
        staging,
        scanner,
        config.max_file_size_bytes(),
    ))
}

pub async fn build_coordinator(config: &Config, pool: PgPool) -> anyhow::Result<IngestionCoordinator> {
    let staging = staging_store(config).await?;
    let storage = PermanentStorage::new(config.permanent_dir())
        .await
        .context("Failed to open permanent storage directory")?;
    let documents = Arc::new(DocumentRepository::new(pool.clone()));
    let document_types = Arc::new(DocumentTypeRepository::new(pool));

    let mut coordinator =
        IngestionCoordinator::new(documents.clone(), document_types, staging, Arc::new(storage))
            .with_retention(config.retention());

    if let Some(sync) = ChecklistSyncService::from_config(config.checklist(), documents) {
        coordinator = coordinator.with_checklist_sync(Arc::new(sync));
    }

    Ok(coordinator)
}
