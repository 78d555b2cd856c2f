//! Mock repository implementations for testing
//!
//! These mocks keep the rules the database enforces (one active document per subject and
//! type, gapless version numbers) so coordinator tests see the same failures.

use async_trait::async_trait;
use chrono::Utc;
use docvault_core::constants::{ACTIVE_DOCUMENT_UNIQUE_INDEX, VERSION_NUMBER_UNIQUE_INDEX};
use docvault_core::models::{
    Document, DocumentStatus, DocumentType, DocumentVersion, NewAuditEntry, NewDocument,
    NewVersion, Subject,
};
use docvault_core::AppError;
use docvault_db::{DocumentStore, DocumentTypeLookup};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Mock document store for testing without database
#[derive(Clone, Default)]
pub struct MockDocumentStore {
    documents: Arc<Mutex<HashMap<Uuid, Document>>>,
    versions: Arc<Mutex<Vec<DocumentVersion>>>,
    audit: Arc<Mutex<Vec<(Uuid, NewAuditEntry)>>>,
    type_names: Arc<Mutex<HashMap<Uuid, String>>>,
    fail_next_create: Arc<Mutex<Option<AppError>>>,
}

impl MockDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `create_document_with_version` fail with `err` without writing.
    pub fn fail_next_create(&self, err: AppError) {
        *self.fail_next_create.lock().unwrap() = Some(err);
    }

    pub fn register_type_name(&self, document_type_id: Uuid, name: &str) {
        self.type_names
            .lock()
            .unwrap()
            .insert(document_type_id, name.to_string());
    }

    pub fn document_count(&self) -> usize {
        self.documents.lock().unwrap().len()
    }

    pub fn get(&self, document_id: Uuid) -> Option<Document> {
        self.documents.lock().unwrap().get(&document_id).cloned()
    }

    pub fn versions_of(&self, document_id: Uuid) -> Vec<DocumentVersion> {
        let mut versions: Vec<_> = self
            .versions
            .lock()
            .unwrap()
            .iter()
            .filter(|v| v.document_id == document_id)
            .cloned()
            .collect();
        versions.sort_by_key(|v| v.version_number);
        versions
    }

    pub fn audit_of(&self, document_id: Uuid) -> Vec<NewAuditEntry> {
        self.audit
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == document_id)
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    fn push_version(&self, document_id: Uuid, version: &NewVersion) -> DocumentVersion {
        let row = DocumentVersion {
            id: Uuid::new_v4(),
            document_id,
            version_number: version.version_number,
            file_path: version.file.file_path.clone(),
            original_name: version.file.original_name.clone(),
            file_size: version.file.file_size,
            file_extension: version.file.file_extension.clone(),
            uploaded_by: version.uploaded_by,
            created_at: Utc::now(),
        };
        self.versions.lock().unwrap().push(row.clone());
        row
    }
}

fn point_at(document: &mut Document, version: &DocumentVersion) {
    document.current_version_number = version.version_number;
    document.current_version_id = Some(version.id);
    document.file_path = version.file_path.clone();
    document.original_name = version.original_name.clone();
    document.file_size = version.file_size;
    document.file_extension = version.file_extension.clone();
    document.updated_at = Utc::now();
}

#[async_trait]
impl DocumentStore for MockDocumentStore {
    async fn find_by_id(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<Document>, AppError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .get(&document_id)
            .filter(|d| d.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_active_by_subject_and_type(
        &self,
        subject: &Subject,
        document_type_id: Uuid,
    ) -> Result<Option<Document>, AppError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .values()
            .find(|d| d.is_owned_by(subject) && d.document_type_id == document_type_id)
            .cloned())
    }

    async fn create_document_with_version(
        &self,
        document: NewDocument,
        version: NewVersion,
        audit: NewAuditEntry,
    ) -> Result<Document, AppError> {
        if let Some(err) = self.fail_next_create.lock().unwrap().take() {
            return Err(err);
        }

        let duplicate = self.documents.lock().unwrap().values().any(|d| {
            d.is_owned_by(&document.subject) && d.document_type_id == document.document_type_id
        });
        if duplicate {
            return Err(AppError::UniqueViolation {
                constraint: Some(ACTIVE_DOCUMENT_UNIQUE_INDEX.to_string()),
                message: "duplicate key value violates unique constraint".to_string(),
            });
        }

        let now = Utc::now();
        let mut row = Document {
            id: Uuid::new_v4(),
            tenant_id: document.subject.tenant_id,
            subject_type: document.subject.subject_type,
            subject_id: document.subject.subject_id,
            document_type_id: document.document_type_id,
            status: document.status,
            current_version_number: 0,
            current_version_id: None,
            file_path: String::new(),
            original_name: String::new(),
            file_size: 0,
            file_extension: String::new(),
            created_by: document.created_by,
            updated_by: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            deleted_by: None,
        };
        let version = self.push_version(row.id, &version);
        point_at(&mut row, &version);

        self.audit.lock().unwrap().push((row.id, audit));
        self.documents.lock().unwrap().insert(row.id, row.clone());
        Ok(row)
    }

    async fn append_version(
        &self,
        document_id: Uuid,
        version: NewVersion,
        audit: NewAuditEntry,
    ) -> Result<Document, AppError> {
        let mut documents = self.documents.lock().unwrap();
        let document = documents
            .get_mut(&document_id)
            .filter(|d| !d.is_deleted())
            .ok_or(AppError::DocumentNotFound { document_id })?;

        let expected = document.current_version_number + 1;
        if version.version_number < expected {
            return Err(AppError::UniqueViolation {
                constraint: Some(VERSION_NUMBER_UNIQUE_INDEX.to_string()),
                message: "version already exists".to_string(),
            });
        }
        if version.version_number > expected {
            return Err(AppError::InvalidInput(format!(
                "Version {} would leave a gap after {}",
                version.version_number, document.current_version_number
            )));
        }

        let actor = version.uploaded_by;
        let row = self.push_version(document_id, &version);
        point_at(document, &row);
        document.updated_by = Some(actor);

        self.audit.lock().unwrap().push((document_id, audit));
        Ok(document.clone())
    }

    async fn soft_delete(
        &self,
        document_id: Uuid,
        actor_id: Uuid,
        audit: NewAuditEntry,
    ) -> Result<Document, AppError> {
        let mut documents = self.documents.lock().unwrap();
        let document = documents
            .get_mut(&document_id)
            .filter(|d| !d.is_deleted())
            .ok_or(AppError::DocumentNotFound { document_id })?;

        document.deleted_at = Some(Utc::now());
        document.deleted_by = Some(actor_id);

        self.audit.lock().unwrap().push((document_id, audit));
        Ok(document.clone())
    }

    async fn update_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
        actor_id: Uuid,
    ) -> Result<Document, AppError> {
        let mut documents = self.documents.lock().unwrap();
        let document = documents
            .get_mut(&document_id)
            .filter(|d| !d.is_deleted())
            .ok_or(AppError::DocumentNotFound { document_id })?;

        document.status = status;
        document.updated_by = Some(actor_id);
        document.updated_at = Utc::now();
        Ok(document.clone())
    }

    async fn list_active_by_subject(&self, subject: &Subject) -> Result<Vec<Document>, AppError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.is_owned_by(subject))
            .cloned()
            .collect())
    }

    async fn list_active_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Document>, AppError> {
        Ok(self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.tenant_id == tenant_id && !d.is_deleted())
            .cloned()
            .collect())
    }

    async fn list_active_type_names(&self, subject: &Subject) -> Result<Vec<String>, AppError> {
        let names = self.type_names.lock().unwrap();
        Ok(self
            .documents
            .lock()
            .unwrap()
            .values()
            .filter(|d| d.is_owned_by(subject))
            .filter_map(|d| names.get(&d.document_type_id).cloned())
            .collect())
    }

    async fn list_versions(&self, document_id: Uuid) -> Result<Vec<DocumentVersion>, AppError> {
        Ok(self.versions_of(document_id))
    }
}

/// Mock document type catalog
#[derive(Clone, Default)]
pub struct MockDocumentTypeLookup {
    types: Arc<Mutex<HashMap<Uuid, DocumentType>>>,
}

impl MockDocumentTypeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_type(&self, tenant_id: Uuid, name: &str, allowed_extensions: &[&str]) -> DocumentType {
        let now = Utc::now();
        let document_type = DocumentType {
            id: Uuid::new_v4(),
            tenant_id,
            category_id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            is_required: false,
            allowed_extensions: allowed_extensions.iter().map(|e| e.to_string()).collect(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.types
            .lock()
            .unwrap()
            .insert(document_type.id, document_type.clone());
        document_type
    }

    /// Soft-delete a type so lookups stop returning it.
    pub fn remove_type(&self, id: Uuid) {
        if let Some(document_type) = self.types.lock().unwrap().get_mut(&id) {
            document_type.deleted_at = Some(Utc::now());
        }
    }
}

#[async_trait]
impl DocumentTypeLookup for MockDocumentTypeLookup {
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<DocumentType>, AppError> {
        Ok(self
            .types
            .lock()
            .unwrap()
            .get(&id)
            .filter(|t| t.tenant_id == tenant_id && t.deleted_at.is_none())
            .cloned())
    }

    async fn find_by_ids(
        &self,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, DocumentType>, AppError> {
        let types = self.types.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| types.get(id))
            .filter(|t| t.tenant_id == tenant_id && t.deleted_at.is_none())
            .map(|t| (t.id, t.clone()))
            .collect())
    }
}
