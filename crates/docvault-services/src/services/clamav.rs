use super::{ScanResult, VirusScanner};
use async_trait::async_trait;
use clamav_client::{clean, Tcp};
use docvault_core::VirusScanConfig;
use std::path::Path;
use std::str;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct ClamAVService {
    host: String,
    port: u16,
    fail_closed: bool,
    /// Timeout in seconds for each scan operation (default: 60)
    timeout_secs: u64,
}

impl ClamAVService {
    /// Create a new ClamAVService.
    ///
    /// # Arguments
    /// * `host` - ClamAV daemon hostname
    /// * `port` - ClamAV daemon port (typically 3310)
    /// * `fail_closed` - If true, treat scan failures/timeouts as errors; if false, allow (fail-open)
    pub fn new(host: String, port: u16, fail_closed: bool) -> Self {
        Self::with_timeout(host, port, fail_closed, 60)
    }

    pub fn with_timeout(host: String, port: u16, fail_closed: bool, timeout_secs: u64) -> Self {
        Self {
            host,
            port,
            fail_closed,
            timeout_secs,
        }
    }

    pub fn from_config(config: &VirusScanConfig) -> Self {
        Self::with_timeout(
            config.host.clone(),
            config.port,
            config.fail_closed,
            config.timeout_secs,
        )
    }

    /// Outcome used when no verdict could be reached.
    fn unavailable(&self, error_msg: String) -> ScanResult {
        if self.fail_closed {
            ScanResult::Error(error_msg)
        } else {
            tracing::warn!(error = %error_msg, "ClamAV scan unavailable, continuing (fail-open)");
            ScanResult::Clean
        }
    }

    /// Scan in-memory data using the sync client inside spawn_blocking.
    pub async fn scan_bytes(&self, data: Vec<u8>) -> ScanResult {
        let start = Instant::now();
        tracing::debug!(host = %self.host, port = %self.port, size = data.len(), "Starting ClamAV scan");
        let address = format!("{}:{}", self.host, self.port);

        let result = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            tokio::task::spawn_blocking(move || {
                let connection = Tcp {
                    host_address: address.as_str(),
                };
                let response = clamav_client::scan_buffer(data.as_slice(), connection, None)
                    .map_err(|e| format!("ClamAV scan error: {}", e))?;
                let is_clean = clean(&response)
                    .map_err(|e| format!("Failed to parse ClamAV response: {}", e))?;
                Ok::<_, String>((is_clean, response))
            }),
        )
        .await;

        match result {
            Ok(Ok(Ok((true, _)))) => {
                tracing::info!(
                    duration_ms = start.elapsed().as_millis(),
                    "File scan completed: clean"
                );
                ScanResult::Clean
            }
            Ok(Ok(Ok((false, response)))) => {
                let response_str = str::from_utf8(&response).unwrap_or("unknown");
                let viruses = parse_virus_names(response_str);
                tracing::warn!(
                    duration_ms = start.elapsed().as_millis(),
                    viruses = ?viruses,
                    "File scan detected virus"
                );
                ScanResult::Infected(viruses)
            }
            Ok(Ok(Err(error_msg))) => {
                tracing::error!(error = %error_msg, "ClamAV scan failed");
                self.unavailable(error_msg)
            }
            Ok(Err(e)) => {
                let error_msg = format!("ClamAV scan task join error: {}", e);
                tracing::error!(error = %error_msg, "ClamAV scan panicked");
                ScanResult::Error(error_msg)
            }
            Err(_) => {
                let error_msg = format!(
                    "ClamAV scan timeout (exceeded {} seconds)",
                    self.timeout_secs
                );
                tracing::error!(error = %error_msg, "ClamAV scan timeout");
                self.unavailable(error_msg)
            }
        }
    }
}

#[async_trait]
impl VirusScanner for ClamAVService {
    async fn scan_file(&self, path: &Path) -> ScanResult {
        match tokio::fs::read(path).await {
            Ok(data) => self.scan_bytes(data).await,
            Err(e) => {
                let error_msg = format!("Failed to read {} for scanning: {}", path.display(), e);
                tracing::error!(error = %error_msg, "ClamAV scan could not read file");
                self.unavailable(error_msg)
            }
        }
    }
}

/// Extract signature names from a clamd reply such as `stream: Eicar-Signature FOUND`.
pub(crate) fn parse_virus_names(response: &str) -> Vec<String> {
    let names: Vec<String> = response
        .split(['\0', '\n'])
        .filter_map(|line| {
            let line = line.trim();
            let rest = line.strip_suffix("FOUND")?;
            let name = rest.rsplit_once(':').map(|(_, n)| n).unwrap_or(rest).trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect();

    if names.is_empty() {
        vec!["unknown".to_string()]
    } else {
        names
    }
}
