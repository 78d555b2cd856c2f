use crate::traits::{DocumentStorage, StorageError, StorageResult};
use async_trait::async_trait;
use std::io::{self, ErrorKind};
use std::path::{Component, Path, PathBuf};
use tokio::fs;

/// Local filesystem store for promoted documents
#[derive(Clone, Debug)]
pub struct PermanentStorage {
    base_path: PathBuf,
}

impl PermanentStorage {
    /// Create a new PermanentStorage instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for permanent files (e.g., "/var/lib/docvault/permanent")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(PermanentStorage { base_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Convert a relative permanent path to a filesystem path.
    ///
    /// Only plain relative components are accepted, so the result always stays under the root.
    fn key_to_path(&self, relative: &str) -> StorageResult<PathBuf> {
        if relative.is_empty() || relative.contains("..") || relative.starts_with('/') {
            return Err(StorageError::InvalidPath(format!(
                "Permanent path '{}' contains invalid characters",
                relative
            )));
        }

        let all_normal = Path::new(relative)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !all_normal {
            return Err(StorageError::InvalidPath(format!(
                "Permanent path '{}' resolves outside storage directory",
                relative
            )));
        }

        Ok(self.base_path.join(relative))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }
}

fn is_cross_device(err: &io::Error) -> bool {
    // EXDEV
    err.kind() == ErrorKind::CrossesDevices || err.raw_os_error() == Some(18)
}

/// Copy `source` to `destination`, fsync it, then remove `source`.
///
/// Used when a rename cannot cross filesystems. A failed copy removes the partial
/// destination and leaves the source alone. A failed source removal is only logged;
/// the staged leftover is picked up by the sweeper.
pub(crate) async fn copy_then_remove(source: &Path, destination: &Path) -> StorageResult<u64> {
    let copied = async {
        let bytes = fs::copy(source, destination).await?;
        let file = fs::File::open(destination).await?;
        file.sync_all().await?;
        Ok::<u64, io::Error>(bytes)
    }
    .await;

    let bytes = match copied {
        Ok(bytes) => bytes,
        Err(e) => {
            if let Err(cleanup) = fs::remove_file(destination).await {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!(
                        error = %cleanup,
                        destination = %destination.display(),
                        "Failed to remove partial destination"
                    );
                }
            }
            return Err(StorageError::PromotionFailed(format!(
                "Failed to copy {} to {}: {}",
                source.display(),
                destination.display(),
                e
            )));
        }
    };

    if let Err(e) = fs::remove_file(source).await {
        tracing::warn!(
            error = %e,
            source = %source.display(),
            "Copied file across devices but could not remove the staged source"
        );
    }

    Ok(bytes)
}

#[async_trait]
impl DocumentStorage for PermanentStorage {
    async fn promote(&self, source: &Path, permanent_path: &str) -> StorageResult<u64> {
        let destination = self.key_to_path(permanent_path)?;
        let start = std::time::Instant::now();

        let size = match fs::metadata(source).await {
            Ok(meta) if meta.is_file() => meta.len(),
            Ok(_) => {
                return Err(StorageError::PromotionFailed(format!(
                    "Source {} is not a regular file",
                    source.display()
                )))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::PromotionFailed(format!(
                    "Source {} does not exist",
                    source.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };

        if fs::try_exists(&destination).await.unwrap_or(false) {
            return Err(StorageError::PromotionFailed(format!(
                "Destination {} already exists",
                destination.display()
            )));
        }

        self.ensure_parent_dir(&destination).await.map_err(|e| {
            StorageError::PromotionFailed(format!(
                "Failed to create directory for {}: {}",
                destination.display(),
                e
            ))
        })?;

        let method = match fs::rename(source, &destination).await {
            Ok(()) => "rename",
            Err(e) if is_cross_device(&e) => {
                tracing::debug!(
                    source = %source.display(),
                    destination = %destination.display(),
                    "Rename crosses devices, falling back to copy"
                );
                copy_then_remove(source, &destination).await?;
                "copy"
            }
            Err(e) => {
                return Err(StorageError::PromotionFailed(format!(
                    "Failed to move {} to {}: {}",
                    source.display(),
                    destination.display(),
                    e
                )))
            }
        };

        tracing::info!(
            path = %destination.display(),
            key = %permanent_path,
            size_bytes = size,
            method,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Promoted staged file"
        );

        Ok(size)
    }

    async fn delete(&self, permanent_path: &str) -> StorageResult<bool> {
        let path = self.key_to_path(permanent_path)?;
        let start = std::time::Instant::now();

        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to delete file {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        tracing::info!(
            path = %path.display(),
            key = %permanent_path,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Permanent file deleted"
        );

        Ok(true)
    }

    async fn exists(&self, permanent_path: &str) -> StorageResult<bool> {
        let path = self.key_to_path(permanent_path)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn delete_folder(&self, folder: &str) -> StorageResult<bool> {
        let path = self.key_to_path(folder)?;

        match fs::remove_dir_all(&path).await {
            Ok(()) => {
                tracing::info!(path = %path.display(), "Permanent folder deleted");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete folder {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn content_length(&self, permanent_path: &str) -> StorageResult<u64> {
        let path = self.key_to_path(permanent_path)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(permanent_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
