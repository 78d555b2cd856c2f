use docvault_core::constants::MAX_DOCUMENTS_PER_REQUEST;
use docvault_core::models::{DocumentStatus, Subject};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// One staged file to be turned into a document of the given type.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DocumentItem {
    pub document_type_id: Uuid,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub staged_path: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub original_name: String,
}

/// Batch create for a single subject, at most `MAX_DOCUMENTS_PER_REQUEST` items.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentsRequest {
    pub subject: Subject,
    pub actor_id: Uuid,
    #[validate(
        length(
            min = 1,
            max = MAX_DOCUMENTS_PER_REQUEST,
            message = "must contain between 1 and 10 documents"
        ),
        nested
    )]
    pub documents: Vec<DocumentItem>,
}

impl CreateDocumentsRequest {
    pub fn staged_paths(&self) -> Vec<&str> {
        self.documents
            .iter()
            .map(|d| d.staged_path.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceDocumentRequest {
    pub subject: Subject,
    pub actor_id: Uuid,
    pub document_id: Uuid,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub staged_path: String,
    #[validate(length(min = 1, message = "must not be empty"))]
    pub original_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteDocumentRequest {
    pub subject: Subject,
    pub actor_id: Uuid,
    pub document_id: Uuid,
    /// Also remove the bytes of every earlier version.
    #[serde(default)]
    pub purge_all_versions: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeStatusRequest {
    pub tenant_id: Uuid,
    pub actor_id: Uuid,
    pub document_id: Uuid,
    pub status: DocumentStatus,
}

/// Active document whose current file is not in permanent storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DanglingDocument {
    pub document_id: Uuid,
    pub subject: Subject,
    pub file_path: String,
    pub reason: String,
}
