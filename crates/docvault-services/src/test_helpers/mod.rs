//! Test helpers for coordinator unit tests
//!
//! In-memory repositories and a storage wrapper with failure injection, so the
//! coordinator can be exercised against a real filesystem without a database.

pub mod mock_repositories;
pub mod mock_storage;

pub use mock_repositories::{MockDocumentStore, MockDocumentTypeLookup};
pub use mock_storage::FlakyStorage;
