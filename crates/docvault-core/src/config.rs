//! Configuration module
//!
//! This module provides configuration structures for the ingestion engine and its
//! background services: database, file roots, staged-file cleanup, virus scanning and
//! the checklist sync endpoint.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::constants::DEFAULT_MAX_FILE_SIZE_BYTES;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const TEMP_CLEANUP_INTERVAL_SECS: u64 = 3600;
const TEMP_CLEANUP_MAX_AGE_HOURS: u64 = 24;
const CLAMAV_PORT: u16 = 3310;
const CLAMAV_TIMEOUT_SECS: u64 = 60;
const CHECKLIST_TIMEOUT_SECS: u64 = 10;

/// Base configuration shared by every binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    pub environment: String,
}

/// File roots and upload limits
#[derive(Clone, Debug)]
pub struct FileConfig {
    pub temp_dir: PathBuf,
    pub permanent_dir: PathBuf,
    pub max_file_size_bytes: u64,
}

/// Orphan sweeper settings
#[derive(Clone, Debug)]
pub struct TempCleanupConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub max_age: Duration,
}

/// ClamAV settings
#[derive(Clone, Debug)]
pub struct VirusScanConfig {
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
    /// Treat scanner failures as rejections instead of letting the file through.
    pub fail_closed: bool,
}

/// Downstream profile checklist endpoint. Sync is disabled when `base_url` is unset.
#[derive(Clone, Debug)]
pub struct ChecklistConfig {
    pub base_url: Option<String>,
    pub timeout: Duration,
}

/// What happens to the previous version's bytes when a document is replaced.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RetentionPolicy {
    #[default]
    Keep,
    DeletePrevious,
}

impl RetentionPolicy {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "keep" => Some(RetentionPolicy::Keep),
            "delete_previous" | "delete-previous" => Some(RetentionPolicy::DeletePrevious),
            _ => None,
        }
    }
}

/// Ingestion-wide settings
#[derive(Clone, Debug)]
pub struct IngestionConfig {
    pub base: BaseConfig,
    pub files: FileConfig,
    pub temp_cleanup: TempCleanupConfig,
    pub virus_scan: VirusScanConfig,
    pub checklist: ChecklistConfig,
    pub retention: RetentionPolicy,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<IngestionConfig>);

impl Config {
    fn as_ingestion(&self) -> &IngestionConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.as_ingestion().base.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = IngestionConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_ingestion().validate()
    }

    pub fn database_url(&self) -> &str {
        &self.as_ingestion().base.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_ingestion().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_ingestion().base.db_timeout_seconds
    }

    pub fn environment(&self) -> &str {
        &self.as_ingestion().base.environment
    }

    pub fn temp_dir(&self) -> &Path {
        &self.as_ingestion().files.temp_dir
    }

    pub fn permanent_dir(&self) -> &Path {
        &self.as_ingestion().files.permanent_dir
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.as_ingestion().files.max_file_size_bytes
    }

    pub fn temp_cleanup(&self) -> &TempCleanupConfig {
        &self.as_ingestion().temp_cleanup
    }

    pub fn virus_scan(&self) -> &VirusScanConfig {
        &self.as_ingestion().virus_scan
    }

    pub fn checklist(&self) -> &ChecklistConfig {
        &self.as_ingestion().checklist
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.as_ingestion().retention
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .map(|v| matches!(v.trim().to_lowercase().as_str(), "true" | "1" | "yes"))
        .unwrap_or(default)
}

impl IngestionConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL must be set"))?;

        let base = BaseConfig {
            database_url,
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            environment,
        };

        let upload_dir =
            PathBuf::from(env::var("FILE_UPLOAD_DIR").unwrap_or_else(|_| "./uploads".to_string()));
        let temp_dir = env::var("FILE_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| upload_dir.join("temp"));
        let permanent_dir = env::var("FILE_PERMANENT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| upload_dir.join("permanent"));

        let files = FileConfig {
            temp_dir,
            permanent_dir,
            max_file_size_bytes: env::var("MAX_FILE_SIZE_BYTES")
                .unwrap_or_else(|_| DEFAULT_MAX_FILE_SIZE_BYTES.to_string())
                .parse()
                .unwrap_or(DEFAULT_MAX_FILE_SIZE_BYTES),
        };

        let max_age_hours: u64 = env::var("TEMP_CLEANUP_MAX_AGE_HOURS")
            .unwrap_or_else(|_| TEMP_CLEANUP_MAX_AGE_HOURS.to_string())
            .parse()
            .unwrap_or(TEMP_CLEANUP_MAX_AGE_HOURS);
        let interval_secs: u64 = env::var("TEMP_CLEANUP_INTERVAL_SECS")
            .unwrap_or_else(|_| TEMP_CLEANUP_INTERVAL_SECS.to_string())
            .parse()
            .unwrap_or(TEMP_CLEANUP_INTERVAL_SECS);

        let temp_cleanup = TempCleanupConfig {
            enabled: env_bool("TEMP_CLEANUP_ENABLED", true),
            interval: Duration::from_secs(interval_secs),
            max_age: Duration::from_secs(max_age_hours * 3600),
        };

        let virus_scan = VirusScanConfig {
            enabled: env_bool("VIRUS_SCAN_ENABLED", true),
            host: env::var("CLAMAV_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("CLAMAV_PORT")
                .unwrap_or_else(|_| CLAMAV_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("CLAMAV_PORT must be a valid port number"))?,
            timeout_secs: env::var("CLAMAV_TIMEOUT_SECS")
                .unwrap_or_else(|_| CLAMAV_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CLAMAV_TIMEOUT_SECS),
            fail_closed: env_bool("CLAMAV_FAIL_CLOSED", false),
        };

        let checklist = ChecklistConfig {
            base_url: env::var("USER_SERVICE_BASE_URL")
                .ok()
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty()),
            timeout: Duration::from_secs(CHECKLIST_TIMEOUT_SECS),
        };

        let retention = match env::var("VERSION_RETENTION") {
            Ok(value) => RetentionPolicy::parse(&value).ok_or_else(|| {
                anyhow::anyhow!(
                    "VERSION_RETENTION must be 'keep' or 'delete_previous', got '{}'",
                    value
                )
            })?,
            Err(_) => RetentionPolicy::default(),
        };

        Ok(Self {
            base,
            files,
            temp_cleanup,
            virus_scan,
            checklist,
            retention,
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        let url = &self.base.database_url;
        if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        let temp = &self.files.temp_dir;
        let permanent = &self.files.permanent_dir;
        if temp == permanent {
            return Err(anyhow::anyhow!(
                "FILE_TEMP_DIR and FILE_PERMANENT_DIR must be different directories"
            ));
        }
        if temp.starts_with(permanent) || permanent.starts_with(temp) {
            return Err(anyhow::anyhow!(
                "FILE_TEMP_DIR and FILE_PERMANENT_DIR must not be nested inside each other"
            ));
        }

        if self.files.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_BYTES must be greater than 0"));
        }

        if self.temp_cleanup.enabled && self.temp_cleanup.max_age.is_zero() {
            return Err(anyhow::anyhow!(
                "TEMP_CLEANUP_MAX_AGE_HOURS must be greater than 0"
            ));
        }

        if self.temp_cleanup.enabled && self.temp_cleanup.interval.is_zero() {
            return Err(anyhow::anyhow!(
                "TEMP_CLEANUP_INTERVAL_SECS must be greater than 0"
            ));
        }

        Ok(())
    }
}
