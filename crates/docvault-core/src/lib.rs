//! Docvault Core Library
//!
//! This crate provides core domain models, error types, configuration, and validation
//! that are shared across all Docvault components.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod validation;

// Re-export commonly used types
pub use config::{
    BaseConfig, ChecklistConfig, Config, FileConfig, IngestionConfig, RetentionPolicy,
    TempCleanupConfig, VirusScanConfig,
};
pub use error::{AppError, ErrorKind, ErrorMetadata, FieldError, LogLevel};
