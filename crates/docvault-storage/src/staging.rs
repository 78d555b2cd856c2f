use crate::paths::sanitize_file_name;
use crate::traits::{StorageError, StorageResult};
use docvault_core::models::{StagedEntry, StagedFile};
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

/// Outcome of a best-effort bulk discard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscardSummary {
    pub deleted_count: usize,
    pub failed_count: usize,
}

/// Staging area for uploaded bytes that have not been validated yet.
///
/// Files live directly under the root with opaque names (`{uuid}{ext}`). Nothing in the
/// database ever points at a staged file.
#[derive(Clone, Debug)]
pub struct StagingStore {
    root: PathBuf,
}

impl StagingStore {
    /// Create a new StagingStore, creating the root directory if needed
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create staging directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(StagingStore { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a staged name to its absolute path. Only bare file names are accepted.
    pub fn resolve(&self, staged_path: &str) -> StorageResult<PathBuf> {
        let mut components = Path::new(staged_path).components();
        let valid = !staged_path.contains(['/', '\\'])
            && matches!(components.next(), Some(Component::Normal(_)))
            && components.next().is_none();
        if !valid {
            return Err(StorageError::InvalidPath(format!(
                "Staged path '{}' is not a plain file name",
                staged_path
            )));
        }
        Ok(self.root.join(staged_path))
    }

    fn new_staged_name(original_name: &str) -> StorageResult<String> {
        let (_, extension) = sanitize_file_name(original_name)?;
        Ok(format!("{}{}", Uuid::new_v4().simple(), extension))
    }

    /// Write `data` under a fresh opaque name.
    pub async fn stage(&self, data: &[u8], original_name: &str) -> StorageResult<StagedFile> {
        let name = Self::new_staged_name(original_name)?;
        let path = self.root.join(&name);
        let start = std::time::Instant::now();

        let result = async {
            let mut file = fs::File::create(&path).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to create file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            file.write_all(data).await.map_err(|e| {
                StorageError::WriteFailed(format!("Failed to write file {}: {}", path.display(), e))
            })?;
            file.sync_all().await.map_err(|e| {
                StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
            })
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&path).await;
            return Err(e);
        }

        tracing::info!(
            staged_path = %name,
            original_name = %original_name,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Staged upload"
        );

        Ok(StagedFile {
            staged_path: name,
            original_name: original_name.to_string(),
            size: data.len() as u64,
        })
    }

    /// Stream `reader` into a fresh opaque name.
    pub async fn stage_stream(
        &self,
        mut reader: Pin<Box<dyn AsyncRead + Send + Unpin>>,
        original_name: &str,
    ) -> StorageResult<StagedFile> {
        let name = Self::new_staged_name(original_name)?;
        let path = self.root.join(&name);
        let start = std::time::Instant::now();

        let result = async {
            let mut file = fs::File::create(&path).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to create file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let copied = tokio::io::copy(&mut reader, &mut file).await.map_err(|e| {
                StorageError::WriteFailed(format!(
                    "Failed to write stream to file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            file.sync_all().await.map_err(|e| {
                StorageError::WriteFailed(format!("Failed to sync file {}: {}", path.display(), e))
            })?;
            Ok::<u64, StorageError>(copied)
        }
        .await;

        let size = match result {
            Ok(size) => size,
            Err(e) => {
                let _ = fs::remove_file(&path).await;
                return Err(e);
            }
        };

        tracing::info!(
            staged_path = %name,
            original_name = %original_name,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Staged streamed upload"
        );

        Ok(StagedFile {
            staged_path: name,
            original_name: original_name.to_string(),
            size,
        })
    }

    /// Whether a staged file exists. Malformed names are reported as absent.
    pub async fn exists(&self, staged_path: &str) -> bool {
        match self.resolve(staged_path) {
            Ok(path) => fs::metadata(&path)
                .await
                .map(|m| m.is_file())
                .unwrap_or(false),
            Err(_) => false,
        }
    }

    pub async fn size(&self, staged_path: &str) -> StorageResult<u64> {
        let path = self.resolve(staged_path)?;
        match fs::metadata(&path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(staged_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Remove a staged file. Returns `false` if it was already gone.
    pub async fn discard(&self, staged_path: &str) -> StorageResult<bool> {
        let path = self.resolve(staged_path)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                tracing::debug!(staged_path = %staged_path, "Discarded staged file");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "Failed to delete staged file {}: {}",
                path.display(),
                e
            ))),
        }
    }

    /// Best-effort removal of several staged files. Missing files count as failures.
    pub async fn discard_many<S: AsRef<str>>(&self, staged_paths: &[S]) -> DiscardSummary {
        let mut summary = DiscardSummary::default();

        for staged_path in staged_paths {
            let staged_path = staged_path.as_ref();
            match self.discard(staged_path).await {
                Ok(true) => summary.deleted_count += 1,
                Ok(false) => {
                    tracing::debug!(staged_path = %staged_path, "Staged file already absent");
                    summary.failed_count += 1;
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        staged_path = %staged_path,
                        "Failed to discard staged file"
                    );
                    summary.failed_count += 1;
                }
            }
        }

        summary
    }

    /// Non-recursive listing of the staging root. Entries whose name is not UTF-8 cannot be
    /// addressed by a staged path; they are logged and left out.
    pub async fn list(&self) -> StorageResult<Vec<StagedEntry>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.root).await?;

        while let Some(entry) = dir.next_entry().await? {
            let name = match entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    tracing::warn!(
                        name = %raw.to_string_lossy(),
                        "Skipping staged entry with a non UTF-8 name"
                    );
                    continue;
                }
            };
            let meta = match entry.metadata().await {
                Ok(meta) => meta,
                Err(e) => {
                    tracing::warn!(error = %e, name = %name, "Failed to stat staged entry");
                    continue;
                }
            };
            let modified = match meta.modified() {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::warn!(error = %e, name = %name, "Staged entry has no modification time");
                    continue;
                }
            };
            entries.push(StagedEntry {
                name,
                size: meta.len(),
                modified,
                is_file: meta.is_file(),
            });
        }

        Ok(entries)
    }
}
