use super::types::{
    ChangeStatusRequest, CreateDocumentsRequest, DanglingDocument, DeleteDocumentRequest,
    DocumentItem, ReplaceDocumentRequest,
};
use crate::checklist::ChecklistSyncService;
use docvault_core::constants::ACTIVE_DOCUMENT_UNIQUE_INDEX;
use docvault_core::models::{
    AuditAction, Document, DocumentStatus, DocumentType, FileRef, NewAuditEntry, NewDocument,
    NewVersion, Subject,
};
use docvault_core::validation::file_extension;
use docvault_core::{AppError, RetentionPolicy};
use docvault_db::{DocumentStore, DocumentTypeLookup};
use docvault_storage::{
    build_permanent_path, subject_folder, DocumentStorage, StagingStore, StorageError,
};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;
use validator::Validate;

/// Why a single item of a batch did not make it.
enum ItemFailure {
    /// Nothing was committed for this item.
    BeforeCommit(AppError),
    /// Metadata is committed but the bytes never reached permanent storage.
    Promotion {
        document: Document,
        permanent_path: String,
        reason: String,
    },
}

impl From<AppError> for ItemFailure {
    fn from(err: AppError) -> Self {
        ItemFailure::BeforeCommit(err)
    }
}

impl From<StorageError> for ItemFailure {
    fn from(err: StorageError) -> Self {
        ItemFailure::BeforeCommit(err.into())
    }
}

/// Moves staged uploads into permanent storage and keeps the document metadata in step.
///
/// Every write follows the same ordering:
/// - create/replace commit metadata first, then promote the bytes;
/// - delete removes bytes first, then soft-deletes the row.
///
/// A failed promotion after commit is reported as [`AppError::Promotion`] and left for an
/// operator; [`IngestionCoordinator::find_dangling_documents`] lists such rows.
#[derive(Clone)]
pub struct IngestionCoordinator {
    documents: Arc<dyn DocumentStore>,
    document_types: Arc<dyn DocumentTypeLookup>,
    staging: StagingStore,
    storage: Arc<dyn DocumentStorage>,
    retention: RetentionPolicy,
    checklist: Option<Arc<ChecklistSyncService>>,
}

impl IngestionCoordinator {
    pub fn new(
        documents: Arc<dyn DocumentStore>,
        document_types: Arc<dyn DocumentTypeLookup>,
        staging: StagingStore,
        storage: Arc<dyn DocumentStorage>,
    ) -> Self {
        Self {
            documents,
            document_types,
            staging,
            storage,
            retention: RetentionPolicy::default(),
            checklist: None,
        }
    }

    pub fn with_retention(mut self, retention: RetentionPolicy) -> Self {
        self.retention = retention;
        self
    }

    pub fn with_checklist_sync(mut self, checklist: Arc<ChecklistSyncService>) -> Self {
        self.checklist = Some(checklist);
        self
    }

    pub fn staging(&self) -> &StagingStore {
        &self.staging
    }

    /// Create version 1 of one document per item.
    ///
    /// The whole batch is validated before anything is written; any validation failure
    /// discards every staged file of the batch. Items are then committed and promoted one
    /// at a time, so a failure part-way leaves the earlier items in place.
    #[tracing::instrument(
        skip(self, request),
        fields(
            tenant_id = %request.subject.tenant_id,
            subject_id = %request.subject.subject_id,
            count = request.documents.len()
        )
    )]
    pub async fn create_documents(
        &self,
        request: CreateDocumentsRequest,
    ) -> Result<Vec<Document>, AppError> {
        let staged_paths = request.staged_paths();

        let document_types = match self.validate_batch(&request).await {
            Ok(types) => types,
            Err(e) => {
                tracing::warn!(error = %e, "Document batch rejected");
                self.discard_staged(&staged_paths).await;
                return Err(e);
            }
        };

        let mut created: Vec<Document> = Vec::with_capacity(request.documents.len());

        for (index, (item, document_type)) in
            request.documents.iter().zip(&document_types).enumerate()
        {
            match self
                .ingest_new(&request.subject, request.actor_id, item, document_type)
                .await
            {
                Ok(document) => created.push(document),
                Err(ItemFailure::BeforeCommit(err)) => {
                    self.discard_staged(&staged_paths[index..]).await;
                    let err = map_active_conflict(err, document_type);
                    if !created.is_empty() {
                        tracing::warn!(
                            error = %err,
                            committed = ?created.iter().map(|d| d.id).collect::<Vec<_>>(),
                            "Document batch stopped after partial success"
                        );
                    }
                    return Err(err);
                }
                Err(ItemFailure::Promotion {
                    document,
                    permanent_path,
                    reason,
                }) => {
                    self.discard_staged(&staged_paths[index..]).await;
                    let mut committed_document_ids: Vec<Uuid> =
                        created.iter().map(|d| d.id).collect();
                    committed_document_ids.push(document.id);
                    tracing::error!(
                        document_id = %document.id,
                        permanent_path = %permanent_path,
                        reason = %reason,
                        "Document committed but its file was not promoted"
                    );
                    return Err(AppError::Promotion {
                        document_id: document.id,
                        permanent_path,
                        reason,
                        committed_document_ids,
                    });
                }
            }
        }

        tracing::info!(created = created.len(), "Documents created");
        self.sync_checklist(request.subject);
        Ok(created)
    }

    /// Checks run over the whole batch before any write, in order: request shape, staged
    /// files, document types, extensions, duplicates. Returns the type of each item.
    async fn validate_batch(
        &self,
        request: &CreateDocumentsRequest,
    ) -> Result<Vec<DocumentType>, AppError> {
        request.validate()?;
        let subject = &request.subject;

        for item in &request.documents {
            if !self.staging.exists(&item.staged_path).await {
                return Err(AppError::TempFileMissing {
                    staged_path: item.staged_path.clone(),
                });
            }
        }

        let mut type_ids: Vec<Uuid> = request
            .documents
            .iter()
            .map(|d| d.document_type_id)
            .collect();
        type_ids.sort();
        type_ids.dedup();
        let known = self
            .document_types
            .find_by_ids(subject.tenant_id, &type_ids)
            .await?;

        let document_types = request
            .documents
            .iter()
            .map(|item| {
                known
                    .get(&item.document_type_id)
                    .cloned()
                    .ok_or(AppError::DocumentTypeNotFound {
                        document_type_id: item.document_type_id,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for (item, document_type) in request.documents.iter().zip(&document_types) {
            check_extension(&item.original_name, document_type)?;
        }

        let mut seen = HashSet::new();
        for document_type in &document_types {
            let duplicate_in_batch = !seen.insert(document_type.id);
            let exists = duplicate_in_batch
                || self
                    .documents
                    .find_active_by_subject_and_type(subject, document_type.id)
                    .await?
                    .is_some();
            if exists {
                return Err(AppError::DocumentAlreadyExists {
                    document_type_id: document_type.id,
                    document_type: Some(document_type.name.clone()),
                });
            }
        }

        Ok(document_types)
    }

    async fn ingest_new(
        &self,
        subject: &Subject,
        actor_id: Uuid,
        item: &DocumentItem,
        document_type: &DocumentType,
    ) -> Result<Document, ItemFailure> {
        let source = self.staging.resolve(&item.staged_path)?;
        let size = self.staging.size(&item.staged_path).await?;
        let permanent_path =
            build_permanent_path(subject, document_type.id, 1, &item.original_name)?;

        let document = self
            .documents
            .create_document_with_version(
                NewDocument {
                    subject: *subject,
                    document_type_id: document_type.id,
                    status: DocumentStatus::Draft,
                    created_by: actor_id,
                },
                NewVersion {
                    version_number: 1,
                    file: FileRef {
                        file_path: permanent_path.clone(),
                        original_name: item.original_name.clone(),
                        file_size: size as i64,
                        file_extension: file_extension(&item.original_name),
                    },
                    uploaded_by: actor_id,
                },
                NewAuditEntry::new(
                    AuditAction::Uploaded,
                    actor_id,
                    json!({
                        "originalName": item.original_name,
                        "stagedPath": item.staged_path,
                    }),
                ),
            )
            .await?;

        match self.storage.promote(&source, &permanent_path).await {
            Ok(_) => {
                tracing::info!(
                    document_id = %document.id,
                    document_type = %document_type.name,
                    file_path = %permanent_path,
                    "Document created"
                );
                Ok(document)
            }
            Err(e) => Err(ItemFailure::Promotion {
                document,
                permanent_path,
                reason: e.to_string(),
            }),
        }
    }

    /// Append a new version to an existing document. The staged file is discarded on any
    /// failure.
    #[tracing::instrument(
        skip(self, request),
        fields(
            tenant_id = %request.subject.tenant_id,
            document_id = %request.document_id
        )
    )]
    pub async fn replace_document(
        &self,
        request: ReplaceDocumentRequest,
    ) -> Result<Document, AppError> {
        let result = self.replace_inner(&request).await;
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Document replacement failed");
            self.discard_staged(&[request.staged_path.as_str()]).await;
        }
        result
    }

    async fn replace_inner(&self, request: &ReplaceDocumentRequest) -> Result<Document, AppError> {
        request.validate()?;
        let subject = &request.subject;

        if !self.staging.exists(&request.staged_path).await {
            return Err(AppError::TempFileMissing {
                staged_path: request.staged_path.clone(),
            });
        }

        let existing = self.owned_document(subject, request.document_id).await?;

        // A type removed after the document was created no longer restricts extensions.
        match self
            .document_types
            .find_by_id(subject.tenant_id, existing.document_type_id)
            .await?
        {
            Some(document_type) => check_extension(&request.original_name, &document_type)?,
            None => tracing::debug!(
                document_type_id = %existing.document_type_id,
                "Document type no longer available, skipping extension check"
            ),
        }

        let version_number = existing.current_version_number + 1;
        let source = self.staging.resolve(&request.staged_path)?;
        let size = self.staging.size(&request.staged_path).await?;
        let permanent_path = build_permanent_path(
            subject,
            existing.document_type_id,
            version_number,
            &request.original_name,
        )?;

        let updated = self
            .documents
            .append_version(
                existing.id,
                NewVersion {
                    version_number,
                    file: FileRef {
                        file_path: permanent_path.clone(),
                        original_name: request.original_name.clone(),
                        file_size: size as i64,
                        file_extension: file_extension(&request.original_name),
                    },
                    uploaded_by: request.actor_id,
                },
                NewAuditEntry::new(
                    AuditAction::Updated,
                    request.actor_id,
                    json!({
                        "originalName": request.original_name,
                        "stagedPath": request.staged_path,
                        "previousVersion": existing.current_version_number,
                        "previousFilePath": existing.file_path,
                    }),
                ),
            )
            .await?;

        let start = Instant::now();
        if let Err(e) = self.storage.promote(&source, &permanent_path).await {
            tracing::error!(
                document_id = %updated.id,
                version = version_number,
                permanent_path = %permanent_path,
                error = %e,
                "Version committed but its file was not promoted"
            );
            return Err(AppError::Promotion {
                document_id: updated.id,
                permanent_path,
                reason: e.to_string(),
                committed_document_ids: vec![updated.id],
            });
        }

        tracing::info!(
            document_id = %updated.id,
            version = version_number,
            file_path = %permanent_path,
            duration_ms = start.elapsed().as_millis(),
            "Document version added"
        );

        if self.retention == RetentionPolicy::DeletePrevious {
            match self.storage.delete(&existing.file_path).await {
                Ok(_) => tracing::debug!(file_path = %existing.file_path, "Previous version file removed"),
                Err(e) => tracing::warn!(
                    error = %e,
                    file_path = %existing.file_path,
                    "Failed to remove previous version file"
                ),
            }
        }

        self.sync_checklist(*subject);
        Ok(updated)
    }

    /// Remove the current file (and optionally every version's file), then soft-delete the
    /// row. A file that is already gone does not stop the delete.
    #[tracing::instrument(
        skip(self, request),
        fields(
            tenant_id = %request.subject.tenant_id,
            document_id = %request.document_id
        )
    )]
    pub async fn delete_document(
        &self,
        request: DeleteDocumentRequest,
    ) -> Result<Document, AppError> {
        let subject = &request.subject;
        let existing = self.owned_document(subject, request.document_id).await?;

        match self.storage.delete(&existing.file_path).await {
            Ok(true) => tracing::debug!(file_path = %existing.file_path, "Document file removed"),
            Ok(false) => tracing::info!(
                file_path = %existing.file_path,
                "Document file already absent"
            ),
            Err(e) => tracing::warn!(
                error = %e,
                file_path = %existing.file_path,
                "Failed to remove document file, continuing with soft delete"
            ),
        }

        if request.purge_all_versions {
            let folder = subject_folder(subject, existing.document_type_id);
            if let Err(e) = self.storage.delete_folder(&folder).await {
                tracing::warn!(error = %e, folder = %folder, "Failed to purge version files");
            }
        }

        let deleted = self
            .documents
            .soft_delete(
                existing.id,
                request.actor_id,
                NewAuditEntry::new(
                    AuditAction::Deleted,
                    request.actor_id,
                    json!({
                        "filePath": existing.file_path,
                        "purgedAllVersions": request.purge_all_versions,
                    }),
                ),
            )
            .await?;

        tracing::info!(document_id = %deleted.id, "Document deleted");
        Ok(deleted)
    }

    #[tracing::instrument(
        skip(self, request),
        fields(document_id = %request.document_id, status = %request.status.as_str())
    )]
    pub async fn change_status(&self, request: ChangeStatusRequest) -> Result<Document, AppError> {
        let existing = self
            .documents
            .find_by_id(request.tenant_id, request.document_id)
            .await?
            .filter(|d| !d.is_deleted())
            .ok_or(AppError::DocumentNotFound {
                document_id: request.document_id,
            })?;

        if existing.status == request.status {
            return Ok(existing);
        }

        let updated = self
            .documents
            .update_status(existing.id, request.status, request.actor_id)
            .await?;
        tracing::info!(
            previous = %existing.status.as_str(),
            "Document status changed"
        );
        Ok(updated)
    }

    pub async fn get_document(&self, subject: &Subject, document_id: Uuid) -> Result<Document, AppError> {
        self.owned_document(subject, document_id).await
    }

    pub async fn list_documents(&self, subject: &Subject) -> Result<Vec<Document>, AppError> {
        self.documents.list_active_by_subject(subject).await
    }

    /// Active documents of a tenant whose current file is missing from permanent storage.
    #[tracing::instrument(skip(self), fields(tenant_id = %tenant_id))]
    pub async fn find_dangling_documents(
        &self,
        tenant_id: Uuid,
    ) -> Result<Vec<DanglingDocument>, AppError> {
        let documents = self.documents.list_active_by_tenant(tenant_id).await?;
        let mut dangling = Vec::new();

        for document in documents {
            let reason = match self.storage.exists(&document.file_path).await {
                Ok(true) => continue,
                Ok(false) => "file missing".to_string(),
                Err(e) => e.to_string(),
            };
            dangling.push(DanglingDocument {
                document_id: document.id,
                subject: document.subject(),
                file_path: document.file_path,
                reason,
            });
        }

        if !dangling.is_empty() {
            tracing::warn!(count = dangling.len(), "Found documents without a permanent file");
        }
        Ok(dangling)
    }

    async fn owned_document(&self, subject: &Subject, document_id: Uuid) -> Result<Document, AppError> {
        self.documents
            .find_by_id(subject.tenant_id, document_id)
            .await?
            .filter(|d| d.is_owned_by(subject))
            .ok_or(AppError::DocumentNotFound { document_id })
    }

    async fn discard_staged(&self, staged_paths: &[&str]) {
        if staged_paths.is_empty() {
            return;
        }
        let summary = self.staging.discard_many(staged_paths).await;
        tracing::debug!(
            deleted = summary.deleted_count,
            failed = summary.failed_count,
            "Discarded staged files"
        );
    }

    fn sync_checklist(&self, subject: Subject) {
        if let Some(checklist) = &self.checklist {
            checklist.spawn_sync(subject);
        }
    }
}

fn check_extension(original_name: &str, document_type: &DocumentType) -> Result<(), AppError> {
    let extension = file_extension(original_name);
    if document_type.allows_extension(&extension) {
        return Ok(());
    }
    Err(AppError::ExtensionNotAllowed {
        original_name: original_name.to_string(),
        extension,
        document_type: document_type.name.clone(),
        allowed: document_type.allowed_extensions.clone(),
    })
}

/// A lost race on the active-document index is the same conflict the pre-check reports.
fn map_active_conflict(err: AppError, document_type: &DocumentType) -> AppError {
    match err {
        AppError::UniqueViolation {
            constraint: Some(ref constraint),
            ..
        } if constraint == ACTIVE_DOCUMENT_UNIQUE_INDEX => AppError::DocumentAlreadyExists {
            document_type_id: document_type.id,
            document_type: Some(document_type.name.clone()),
        },
        other => other,
    }
}
