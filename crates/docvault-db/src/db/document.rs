//! Document repository: documents plus their versions, audit log and status timeline.
//!
//! Every write here runs as one transaction covering the document row and the rows
//! appended next to it. No filesystem work happens inside these transactions.

use crate::db::transaction::with_transaction;
use docvault_core::constants::VERSION_NUMBER_UNIQUE_INDEX;
use docvault_core::models::{
    AuditAction, AuditLogEntry, Document, DocumentStatus, DocumentVersion, NewAuditEntry,
    NewDocument, NewVersion, StatusTimelineEntry, Subject,
};
use docvault_core::AppError;
use serde_json::json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

macro_rules! document_columns {
    () => {
        "id, tenant_id, subject_type, subject_id, document_type_id, status, \
         current_version_number, current_version_id, file_path, original_name, file_size, \
         file_extension, created_by, updated_by, created_at, updated_at, deleted_at, deleted_by"
    };
}

macro_rules! version_columns {
    () => {
        "id, document_id, version_number, file_path, original_name, file_size, file_extension, \
         uploaded_by, created_at"
    };
}

#[derive(Clone)]
pub struct DocumentRepository {
    pool: PgPool,
}

impl DocumentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Insert the first version of a document together with its audit and timeline rows.
    ///
    /// A second active document for the same subject and type fails with
    /// `AppError::UniqueViolation` on `documents_active_subject_type_uniq`.
    #[tracing::instrument(
        skip(self, document, version, audit),
        fields(
            db.table = "documents",
            db.operation = "insert",
            document_type_id = %document.document_type_id
        )
    )]
    pub async fn create_document_with_version(
        &self,
        document: NewDocument,
        version: NewVersion,
        audit: NewAuditEntry,
    ) -> Result<Document, AppError> {
        let created = with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let (document_id,): (Uuid,) = sqlx::query_as(
                    r#"
                    INSERT INTO documents (
                        tenant_id, subject_type, subject_id, document_type_id, status,
                        current_version_number, file_path, original_name, file_size,
                        file_extension, created_by
                    )
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
                    RETURNING id
                    "#,
                )
                .bind(document.subject.tenant_id)
                .bind(document.subject.subject_type)
                .bind(document.subject.subject_id)
                .bind(document.document_type_id)
                .bind(document.status)
                .bind(version.version_number)
                .bind(&version.file.file_path)
                .bind(&version.file.original_name)
                .bind(version.file.file_size)
                .bind(&version.file.file_extension)
                .bind(document.created_by)
                .fetch_one(&mut **tx)
                .await?;

                let inserted = insert_version(tx, document_id, &version).await?;

                let created = sqlx::query_as::<Postgres, Document>(concat!(
                    "UPDATE documents SET current_version_id = $2 WHERE id = $1 RETURNING ",
                    document_columns!()
                ))
                .bind(document_id)
                .bind(inserted.id)
                .fetch_one(&mut **tx)
                .await?;

                insert_audit(tx, document_id, Some(inserted.id), &audit).await?;
                insert_timeline(tx, document_id, created.status, document.created_by).await?;

                Ok::<_, AppError>(created)
            })
        })
        .await?;

        tracing::info!(
            document_id = %created.id,
            version_id = ?created.current_version_id,
            file_path = %created.file_path,
            "Document created"
        );

        Ok(created)
    }

    /// Append a new version to an active document and point the document at it.
    ///
    /// `version.version_number` must be exactly one more than the current number.
    #[tracing::instrument(
        skip(self, version, audit),
        fields(db.table = "documents", db.operation = "update", document_id = %document_id)
    )]
    pub async fn append_version(
        &self,
        document_id: Uuid,
        version: NewVersion,
        audit: NewAuditEntry,
    ) -> Result<Document, AppError> {
        let updated = with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let current = lock_active(tx, document_id)
                    .await?
                    .ok_or(AppError::DocumentNotFound { document_id })?;

                let expected = current.current_version_number + 1;
                if version.version_number < expected {
                    return Err(AppError::UniqueViolation {
                        constraint: Some(VERSION_NUMBER_UNIQUE_INDEX.to_string()),
                        message: format!(
                            "Version {} of document {} already exists",
                            version.version_number, document_id
                        ),
                    });
                }
                if version.version_number > expected {
                    return Err(AppError::InvalidInput(format!(
                        "Version {} would leave a gap after version {}",
                        version.version_number, current.current_version_number
                    )));
                }

                let inserted = insert_version(tx, document_id, &version).await?;

                let updated = sqlx::query_as::<Postgres, Document>(concat!(
                    r#"
                    UPDATE documents
                    SET current_version_number = $2,
                        current_version_id = $3,
                        file_path = $4,
                        original_name = $5,
                        file_size = $6,
                        file_extension = $7,
                        updated_by = $8,
                        updated_at = NOW()
                    WHERE id = $1 AND deleted_at IS NULL
                    RETURNING "#,
                    document_columns!()
                ))
                .bind(document_id)
                .bind(inserted.version_number)
                .bind(inserted.id)
                .bind(&inserted.file_path)
                .bind(&inserted.original_name)
                .bind(inserted.file_size)
                .bind(&inserted.file_extension)
                .bind(version.uploaded_by)
                .fetch_one(&mut **tx)
                .await?;

                insert_audit(tx, document_id, Some(inserted.id), &audit).await?;
                insert_timeline(tx, document_id, updated.status, version.uploaded_by).await?;

                Ok::<_, AppError>(updated)
            })
        })
        .await?;

        tracing::info!(
            document_id = %updated.id,
            version_number = updated.current_version_number,
            file_path = %updated.file_path,
            "Document version appended"
        );

        Ok(updated)
    }

    /// Mark a document deleted and record the DELETED audit entry.
    #[tracing::instrument(
        skip(self, audit),
        fields(db.table = "documents", db.operation = "soft_delete", document_id = %document_id)
    )]
    pub async fn soft_delete(
        &self,
        document_id: Uuid,
        actor_id: Uuid,
        audit: NewAuditEntry,
    ) -> Result<Document, AppError> {
        with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let deleted = sqlx::query_as::<Postgres, Document>(concat!(
                    r#"
                    UPDATE documents
                    SET deleted_at = NOW(),
                        deleted_by = $2,
                        updated_by = $2,
                        updated_at = NOW()
                    WHERE id = $1 AND deleted_at IS NULL
                    RETURNING "#,
                    document_columns!()
                ))
                .bind(document_id)
                .bind(actor_id)
                .fetch_optional(&mut **tx)
                .await?
                .ok_or(AppError::DocumentNotFound { document_id })?;

                insert_audit(tx, document_id, deleted.current_version_id, &audit).await?;

                Ok::<_, AppError>(deleted)
            })
        })
        .await
    }

    /// Change the review status, appending timeline and audit rows.
    ///
    /// Setting the status a document already has is a no-op.
    #[tracing::instrument(
        skip(self),
        fields(db.table = "documents", db.operation = "update_status", document_id = %document_id)
    )]
    pub async fn update_status(
        &self,
        document_id: Uuid,
        status: DocumentStatus,
        actor_id: Uuid,
    ) -> Result<Document, AppError> {
        with_transaction(&self.pool, move |tx| {
            Box::pin(async move {
                let current = lock_active(tx, document_id)
                    .await?
                    .ok_or(AppError::DocumentNotFound { document_id })?;

                if current.status == status {
                    return Ok(current);
                }

                let updated = sqlx::query_as::<Postgres, Document>(concat!(
                    r#"
                    UPDATE documents
                    SET status = $2, updated_by = $3, updated_at = NOW()
                    WHERE id = $1
                    RETURNING "#,
                    document_columns!()
                ))
                .bind(document_id)
                .bind(status)
                .bind(actor_id)
                .fetch_one(&mut **tx)
                .await?;

                insert_timeline(tx, document_id, status, actor_id).await?;
                let audit = NewAuditEntry::new(
                    AuditAction::StatusChanged,
                    actor_id,
                    json!({
                        "previousStatus": current.status.as_str(),
                        "newStatus": status.as_str(),
                    }),
                );
                insert_audit(tx, document_id, updated.current_version_id, &audit).await?;

                Ok::<_, AppError>(updated)
            })
        })
        .await
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", db.record_id = %document_id))]
    pub async fn find_by_id(
        &self,
        tenant_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<Document>, AppError> {
        let document = sqlx::query_as::<Postgres, Document>(concat!(
            "SELECT ",
            document_columns!(),
            " FROM documents WHERE id = $1 AND tenant_id = $2"
        ))
        .bind(document_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(document)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents"))]
    pub async fn find_active_by_subject_and_type(
        &self,
        subject: &Subject,
        document_type_id: Uuid,
    ) -> Result<Option<Document>, AppError> {
        let document = sqlx::query_as::<Postgres, Document>(concat!(
            "SELECT ",
            document_columns!(),
            r#" FROM documents
            WHERE tenant_id = $1 AND subject_type = $2 AND subject_id = $3
              AND document_type_id = $4 AND deleted_at IS NULL"#
        ))
        .bind(subject.tenant_id)
        .bind(subject.subject_type)
        .bind(subject.subject_id)
        .bind(document_type_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(document)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents"))]
    pub async fn list_active_by_subject(
        &self,
        subject: &Subject,
    ) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<Postgres, Document>(concat!(
            "SELECT ",
            document_columns!(),
            r#" FROM documents
            WHERE tenant_id = $1 AND subject_type = $2 AND subject_id = $3
              AND deleted_at IS NULL
            ORDER BY created_at"#
        ))
        .bind(subject.tenant_id)
        .bind(subject.subject_type)
        .bind(subject.subject_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }

    #[tracing::instrument(skip(self), fields(db.table = "documents", tenant_id = %tenant_id))]
    pub async fn list_active_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<Document>, AppError> {
        let documents = sqlx::query_as::<Postgres, Document>(concat!(
            "SELECT ",
            document_columns!(),
            " FROM documents WHERE tenant_id = $1 AND deleted_at IS NULL ORDER BY created_at"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(documents)
    }

    /// Names of the document types the subject currently has an active document for.
    #[tracing::instrument(skip(self), fields(db.table = "documents"))]
    pub async fn list_active_type_names(&self, subject: &Subject) -> Result<Vec<String>, AppError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT DISTINCT dt.name
            FROM documents d
            JOIN document_types dt ON dt.id = d.document_type_id
            WHERE d.tenant_id = $1 AND d.subject_type = $2 AND d.subject_id = $3
              AND d.deleted_at IS NULL
            ORDER BY dt.name
            "#,
        )
        .bind(subject.tenant_id)
        .bind(subject.subject_type)
        .bind(subject.subject_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_versions", document_id = %document_id))]
    pub async fn list_versions(&self, document_id: Uuid) -> Result<Vec<DocumentVersion>, AppError> {
        let versions = sqlx::query_as::<Postgres, DocumentVersion>(concat!(
            "SELECT ",
            version_columns!(),
            " FROM document_versions WHERE document_id = $1 ORDER BY version_number"
        ))
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(versions)
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_audit_log", document_id = %document_id))]
    pub async fn list_audit_log(&self, document_id: Uuid) -> Result<Vec<AuditLogEntry>, AppError> {
        let entries = sqlx::query_as::<Postgres, AuditLogEntry>(
            r#"
            SELECT id, document_id, version_id, action, actor_id, metadata, created_at
            FROM document_audit_log
            WHERE document_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_status_timeline", document_id = %document_id))]
    pub async fn list_status_timeline(
        &self,
        document_id: Uuid,
    ) -> Result<Vec<StatusTimelineEntry>, AppError> {
        let entries = sqlx::query_as::<Postgres, StatusTimelineEntry>(
            r#"
            SELECT id, document_id, status, changed_by, created_at
            FROM document_status_timeline
            WHERE document_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(entries)
    }
}

async fn lock_active(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
) -> Result<Option<Document>, AppError> {
    let document = sqlx::query_as::<Postgres, Document>(concat!(
        "SELECT ",
        document_columns!(),
        " FROM documents WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
    ))
    .bind(document_id)
    .fetch_optional(&mut **tx)
    .await?;
    Ok(document)
}

async fn insert_version(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    version: &NewVersion,
) -> Result<DocumentVersion, AppError> {
    let inserted = sqlx::query_as::<Postgres, DocumentVersion>(concat!(
        r#"
        INSERT INTO document_versions (
            document_id, version_number, file_path, original_name, file_size,
            file_extension, uploaded_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING "#,
        version_columns!()
    ))
    .bind(document_id)
    .bind(version.version_number)
    .bind(&version.file.file_path)
    .bind(&version.file.original_name)
    .bind(version.file.file_size)
    .bind(&version.file.file_extension)
    .bind(version.uploaded_by)
    .fetch_one(&mut **tx)
    .await?;
    Ok(inserted)
}

async fn insert_audit(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    version_id: Option<Uuid>,
    audit: &NewAuditEntry,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO document_audit_log (document_id, version_id, action, actor_id, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(document_id)
    .bind(version_id)
    .bind(audit.action)
    .bind(audit.actor_id)
    .bind(&audit.metadata)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_timeline(
    tx: &mut Transaction<'_, Postgres>,
    document_id: Uuid,
    status: DocumentStatus,
    changed_by: Uuid,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO document_status_timeline (document_id, status, changed_by)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(document_id)
    .bind(status)
    .bind(changed_by)
    .execute(&mut **tx)
    .await?;
    Ok(())
}
