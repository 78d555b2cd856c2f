//! Storage wrapper with promotion failure injection

use async_trait::async_trait;
use docvault_storage::{DocumentStorage, PermanentStorage, StorageError, StorageResult};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Delegates to a real [`PermanentStorage`] unless told to fail promotions.
#[derive(Clone)]
pub struct FlakyStorage {
    inner: PermanentStorage,
    fail_promote: Arc<AtomicBool>,
}

impl FlakyStorage {
    pub fn new(inner: PermanentStorage) -> Self {
        Self {
            inner,
            fail_promote: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_promotions(&self, fail: bool) {
        self.fail_promote.store(fail, Ordering::SeqCst);
    }

    pub fn base_path(&self) -> &Path {
        self.inner.base_path()
    }
}

#[async_trait]
impl DocumentStorage for FlakyStorage {
    async fn promote(&self, source: &Path, permanent_path: &str) -> StorageResult<u64> {
        if self.fail_promote.load(Ordering::SeqCst) {
            return Err(StorageError::PromotionFailed(format!(
                "injected failure promoting to {}",
                permanent_path
            )));
        }
        self.inner.promote(source, permanent_path).await
    }

    async fn delete(&self, permanent_path: &str) -> StorageResult<bool> {
        self.inner.delete(permanent_path).await
    }

    async fn exists(&self, permanent_path: &str) -> StorageResult<bool> {
        self.inner.exists(permanent_path).await
    }

    async fn delete_folder(&self, folder: &str) -> StorageResult<bool> {
        self.inner.delete_folder(folder).await
    }

    async fn content_length(&self, permanent_path: &str) -> StorageResult<u64> {
        self.inner.content_length(permanent_path).await
    }
}
