//! Repository trait abstractions
//!
//! These traits define the interface the ingestion coordinator needs from the database,
//! allowing the coordinator to be tested without a running PostgreSQL.

use async_trait::async_trait;
use docvault_core::error::AppError;
use docvault_core::models::{
    Document, DocumentStatus, DocumentType, DocumentVersion, NewAuditEntry, NewDocument,
    NewVersion, Subject,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::document::DocumentRepository;
use crate::db::document_type::DocumentTypeRepository;

/// Document metadata operations used during ingestion
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Get a document of a tenant by ID, including soft-deleted rows
    async fn find_by_id(&self, tenant_id: Uuid, document_id: Uuid)
        -> Result<Option<Document>, AppError>;

    /// Get the active document for a subject and document type
    async fn find_active_by_subject_and_type(
        &self,
        subject: &Subject,
        document_type_id: Uuid,
    ) -> Result<Option<Document>, AppError>;

    /// Create a document, its first version, audit entry and timeline entry atomically
    async fn create_document_with_version(
        &self,
        document: NewDocument,
        version: NewVersion,
        audit: NewAuditEntry,
    ) -> Result<Document, AppError>;

    /// Append a version and repoint the document atomically
    async fn append_version(
        &self,
        document_id: Uuid,
        version: NewVersion,
        audit: NewAuditEntry,
    ) -> Result<Document, AppError>;

    /// Soft-delete a document and record the audit entry atomically
    async fn soft_delete(
        &self,
        document_id: Uuid,
        actor_id: Uuid,
        audit: NewAuditEntry,
    ) -> Result<Document, AppError>;

    async fn update_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
        actor_id: Uuid,
    ) -> Result<Document, AppError>;

    async fn list_active_by_subject(&self, subject: &Subject) -> Result<Vec<Document>, AppError>;

    async fn list_active_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Document>, AppError>;

    async fn list_active_type_names(&self, subject: &Subject) -> Result<Vec<String>, AppError>;

    async fn list_versions(&self, document_id: Uuid) -> Result<Vec<DocumentVersion>, AppError>;
}

/// Document type lookups used during validation
#[async_trait]
pub trait DocumentTypeLookup: Send + Sync {
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<DocumentType>, AppError>;

    async fn find_by_ids(
        &self,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, DocumentType>, AppError>;
}

// Implementations for concrete repository types

#[async_trait]
impl DocumentStore for DocumentRepository {
    async fn find_by_id(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<Document>, AppError> {
        DocumentRepository::find_by_id(self, tenant_id, document_id).await
    }

    async fn find_active_by_subject_and_type(
        &self,
        subject: &Subject,
        document_type_id: Uuid,
    ) -> Result<Option<Document>, AppError> {
        DocumentRepository::find_active_by_subject_and_type(self, subject, document_type_id).await
    }

    async fn create_document_with_version(
        &self,
        document: NewDocument,
        version: NewVersion,
        audit: NewAuditEntry,
    ) -> Result<Document, AppError> {
        DocumentRepository::create_document_with_version(self, document, version, audit).await
    }

    async fn append_version(
        &self,
        document_id: Uuid,
        version: NewVersion,
        audit: NewAuditEntry,
    ) -> Result<Document, AppError> {
        DocumentRepository::append_version(self, document_id, version, audit).await
    }

    async fn soft_delete(
        &self,
        document_id: Uuid,
        actor_id: Uuid,
        audit: NewAuditEntry,
    ) -> Result<Document, AppError> {
        DocumentRepository::soft_delete(self, document_id, actor_id, audit).await
    }

    async fn update_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
        actor_id: Uuid,
    ) -> Result<Document, AppError> {
        DocumentRepository::update_status(self, document_id, status, actor_id).await
    }

    async fn list_active_by_subject(&self, subject: &Subject) -> Result<Vec<Document>, AppError> {
        DocumentRepository::list_active_by_subject(self, subject).await
    }

    async fn list_active_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Document>, AppError> {
        DocumentRepository::list_active_by_tenant(self, tenant_id).await
    }

    async fn list_active_type_names(&self, subject: &Subject) -> Result<Vec<String>, AppError> {
        DocumentRepository::list_active_type_names(self, subject).await
    }

    async fn list_versions(&self, document_id: Uuid) -> Result<Vec<DocumentVersion>, AppError> {
        DocumentRepository::list_versions(self, document_id).await
    }
}

#[async_trait]
impl DocumentTypeLookup for DocumentTypeRepository {
    async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<DocumentType>, AppError> {
        DocumentTypeRepository::find_by_id(self, tenant_id, id).await
    }

    async fn find_by_ids(
        &self,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, DocumentType>, AppError> {
        DocumentTypeRepository::find_by_ids(self, tenant_id, ids).await
    }
}
