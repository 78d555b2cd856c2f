//! Docvault Storage Library
//!
//! Filesystem side of ingestion: the staging area for unvalidated uploads, the path
//! builder for permanent locations, and the promotion engine that moves bytes from one
//! to the other.
//!
//! # Permanent path format
//!
//! `{tenant}/{subjectType}/{subjectId}/{documentTypeId}/v{version}_{timestampMs}_{name}{ext}`
//!
//! Paths are relative to the permanent root. They never contain `..` or a leading `/`.
//! Staged file names are opaque and are never interpolated into permanent paths.

pub mod paths;
pub mod permanent;
pub mod staging;
pub mod traits;

// Re-export commonly used types
pub use paths::{build_permanent_path, build_permanent_path_at, sanitize_file_name, subject_folder};
pub use permanent::PermanentStorage;
pub use staging::{DiscardSummary, StagingStore};
pub use traits::{DocumentStorage, StorageError, StorageResult};
