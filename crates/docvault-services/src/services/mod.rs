use async_trait::async_trait;
use std::path::Path;

#[cfg(feature = "clamav")]
pub mod clamav;

#[cfg(feature = "clamav")]
pub use clamav::ClamAVService;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    Clean,
    Infected(Vec<String>),
    Error(String),
}

/// Virus-scan oracle consulted before a staged file is handed back to the caller.
///
/// Implementations decide how scanner failures are reported: a fail-open scanner returns
/// [`ScanResult::Clean`] when it cannot reach a verdict.
#[async_trait]
pub trait VirusScanner: Send + Sync {
    async fn scan_file(&self, path: &Path) -> ScanResult;
}
