use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;

/// A file sitting in the staging area, not yet tied to any document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StagedFile {
    /// Opaque file name relative to the staging root.
    pub staged_path: String,
    pub original_name: String,
    pub size: u64,
}

/// Directory listing entry used by the sweeper.
#[derive(Debug, Clone)]
pub struct StagedEntry {
    pub name: String,
    pub size: u64,
    pub modified: SystemTime,
    pub is_file: bool,
}
