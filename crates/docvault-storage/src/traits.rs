//! Storage abstraction trait
//!
//! This module defines the `DocumentStorage` trait implemented by the permanent store,
//! along with the storage error type.

use async_trait::async_trait;
use docvault_core::AppError;
use std::path::Path;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Write failed: {0}")]
    WriteFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Promotion failed: {0}")]
    PromotionFailed(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidPath(msg) => AppError::InvalidInput(msg),
            StorageError::NotFound(path) => AppError::NotFound(path),
            other => AppError::Storage(other.to_string()),
        }
    }
}

/// Durable store for promoted document bytes.
///
/// Paths are relative to the store root, as produced by [`crate::paths`].
#[async_trait]
pub trait DocumentStorage: Send + Sync {
    /// Move `source` to `permanent_path`, creating parent directories as needed.
    ///
    /// Returns the size in bytes of the promoted file. On failure the source is left in
    /// place and no partial destination remains.
    async fn promote(&self, source: &Path, permanent_path: &str) -> StorageResult<u64>;

    /// Remove a permanent file. Returns `false` when it was already absent.
    async fn delete(&self, permanent_path: &str) -> StorageResult<bool>;

    async fn exists(&self, permanent_path: &str) -> StorageResult<bool>;

    /// Remove a directory and everything beneath it. Returns `false` when it was already absent.
    async fn delete_folder(&self, folder: &str) -> StorageResult<bool>;

    async fn content_length(&self, permanent_path: &str) -> StorageResult<u64>;
}
