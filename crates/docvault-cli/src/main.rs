//! docvault: operator commands for the document ingestion engine.
//!
//! Configuration comes from the environment (and `.env`); see `Config::from_env`.

use anyhow::Context;
use clap::{Parser, Subcommand};
use docvault_cli::{
    build_coordinator, build_sweeper, build_upload_service, init_tracing, print_json,
};
use docvault_core::models::DocumentStatus;
use docvault_core::Config;
use docvault_services::ChangeStatusRequest;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "docvault", about = "Document ingestion operator CLI")]
struct Cli {
    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply pending database migrations
    Migrate,
    /// Delete staged files older than TEMP_CLEANUP_MAX_AGE_HOURS
    Sweep {
        /// Keep running on TEMP_CLEANUP_INTERVAL_SECS until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Stage a local file as an upload (size check and virus scan included)
    Stage {
        /// Path to the file to stage
        file: PathBuf,
        /// Name to record instead of the file's own name
        #[arg(long)]
        name: Option<String>,
    },
    /// Discard staged files by their staged names
    Discard {
        #[arg(required = true)]
        staged_paths: Vec<String>,
    },
    /// List active documents whose permanent file is missing
    Dangling {
        /// Tenant UUID
        tenant_id: Uuid,
    },
    /// Change the review status of a document
    SetStatus {
        tenant_id: Uuid,
        document_id: Uuid,
        /// DRAFT, SUBMITTED, VERIFIED or REJECTED
        status: DocumentStatus,
        /// Who is making the change
        #[arg(long)]
        actor: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    match cli.command {
        Commands::Migrate => {
            let pool = docvault_db::connect(&config).await?;
            docvault_db::run_migrations(&pool).await?;
            print_json(&serde_json::json!({ "success": true }))?;
        }
        Commands::Sweep { watch } => {
            let sweeper = build_sweeper(&config).await?;
            if watch {
                let cleanup = config.temp_cleanup();
                if !cleanup.enabled {
                    anyhow::bail!("Staging cleanup is disabled (TEMP_CLEANUP_ENABLED=false)");
                }
                let handle = Arc::new(sweeper).start(cleanup.interval);
                tokio::signal::ctrl_c()
                    .await
                    .context("Failed to listen for shutdown signal")?;
                tracing::info!("Shutting down sweeper");
                handle.abort();
            } else {
                let stats = sweeper.sweep().await?;
                print_json(&stats)?;
            }
        }
        Commands::Stage { file, name } => {
            let original_name = match name {
                Some(name) => name,
                None => file
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .context("File path has no file name")?,
            };
            let data = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let uploads = build_upload_service(&config).await?;
            let staged = uploads.stage_upload(&original_name, &data).await?;
            print_json(&staged)?;
        }
        Commands::Discard { staged_paths } => {
            let uploads = build_upload_service(&config).await?;
            let summary = uploads.discard_uploads(&staged_paths).await;
            print_json(&serde_json::json!({
                "deletedCount": summary.deleted_count,
                "failedCount": summary.failed_count,
            }))?;
        }
        Commands::Dangling { tenant_id } => {
            let pool = docvault_db::connect(&config).await?;
            let coordinator = build_coordinator(&config, pool).await?;
            let dangling = coordinator.find_dangling_documents(tenant_id).await?;
            print_json(&dangling)?;
        }
        Commands::SetStatus {
            tenant_id,
            document_id,
            status,
            actor,
        } => {
            let pool = docvault_db::connect(&config).await?;
            let coordinator = build_coordinator(&config, pool).await?;
            let document = coordinator
                .change_status(ChangeStatusRequest {
                    tenant_id,
                    actor_id: actor,
                    document_id,
                    status,
                })
                .await?;
            print_json(&document)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn set_status_parses_case_insensitively() {
        let id = Uuid::new_v4().to_string();
        let cli = Cli::try_parse_from([
            "docvault",
            "set-status",
            id.as_str(),
            id.as_str(),
            "verified",
            "--actor",
            id.as_str(),
        ])
        .unwrap();
        match cli.command {
            Commands::SetStatus { status, .. } => assert_eq!(status, DocumentStatus::Verified),
            _ => panic!("expected set-status"),
        }
    }

    #[test]
    fn discard_requires_paths() {
        assert!(Cli::try_parse_from(["docvault", "discard"]).is_err());
    }
}
