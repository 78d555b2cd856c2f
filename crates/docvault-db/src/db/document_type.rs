//! Document category and type catalog.

use docvault_core::models::{
    DocumentCategory, DocumentType, NewDocumentCategory, NewDocumentType,
};
use docvault_core::validation::normalize_extension;
use docvault_core::AppError;
use sqlx::{PgPool, Postgres};
use std::collections::HashMap;
use uuid::Uuid;

macro_rules! type_columns {
    () => {
        "id, tenant_id, category_id, name, description, is_required, allowed_extensions, \
         created_at, updated_at, deleted_at"
    };
}

/// Repository for document_categories table.
#[derive(Clone)]
pub struct DocumentCategoryRepository {
    pool: PgPool,
}

impl DocumentCategoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[tracing::instrument(skip(self, category), fields(db.table = "document_categories", db.operation = "insert"))]
    pub async fn create(&self, category: NewDocumentCategory) -> Result<DocumentCategory, AppError> {
        let row = sqlx::query_as::<Postgres, DocumentCategory>(
            r#"
            INSERT INTO document_categories (tenant_id, name, description)
            VALUES ($1, $2, $3)
            RETURNING id, tenant_id, name, description, created_at, updated_at, deleted_at
            "#,
        )
        .bind(category.tenant_id)
        .bind(&category.name)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_categories", db.record_id = %id))]
    pub async fn find_by_id(
        &self,
        tenant_id: Uuid,
        id: Uuid,
    ) -> Result<Option<DocumentCategory>, AppError> {
        let row = sqlx::query_as::<Postgres, DocumentCategory>(
            r#"
            SELECT id, tenant_id, name, description, created_at, updated_at, deleted_at
            FROM document_categories
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }
}

/// Repository for document_types table.
#[derive(Clone)]
pub struct DocumentTypeRepository {
    pool: PgPool,
}

impl DocumentTypeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Insert a document type. Extensions are stored normalized (lower-case, no dot).
    #[tracing::instrument(skip(self, document_type), fields(db.table = "document_types", db.operation = "insert"))]
    pub async fn create(&self, document_type: NewDocumentType) -> Result<DocumentType, AppError> {
        let extensions: Vec<String> = document_type
            .allowed_extensions
            .iter()
            .map(|e| normalize_extension(e))
            .filter(|e| !e.is_empty())
            .collect();

        let row = sqlx::query_as::<Postgres, DocumentType>(concat!(
            r#"
            INSERT INTO document_types (
                tenant_id, category_id, name, description, is_required, allowed_extensions
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING "#,
            type_columns!()
        ))
        .bind(document_type.tenant_id)
        .bind(document_type.category_id)
        .bind(&document_type.name)
        .bind(&document_type.description)
        .bind(document_type.is_required)
        .bind(&extensions)
        .fetch_one(&self.pool)
        .await?;
        Ok(row)
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_types", db.record_id = %id))]
    pub async fn find_by_id(&self, tenant_id: Uuid, id: Uuid) -> Result<Option<DocumentType>, AppError> {
        let row = sqlx::query_as::<Postgres, DocumentType>(concat!(
            "SELECT ",
            type_columns!(),
            " FROM document_types WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL"
        ))
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    /// Fetch several active types of one tenant in one query. Missing ids are simply absent.
    #[tracing::instrument(skip(self, ids), fields(db.table = "document_types", count = ids.len()))]
    pub async fn find_by_ids(
        &self,
        tenant_id: Uuid,
        ids: &[Uuid],
    ) -> Result<HashMap<Uuid, DocumentType>, AppError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let rows = sqlx::query_as::<Postgres, DocumentType>(concat!(
            "SELECT ",
            type_columns!(),
            " FROM document_types WHERE id = ANY($1) AND tenant_id = $2 AND deleted_at IS NULL"
        ))
        .bind(ids)
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|r| (r.id, r)).collect())
    }

    #[tracing::instrument(skip(self), fields(db.table = "document_types", tenant_id = %tenant_id))]
    pub async fn list_by_tenant(&self, tenant_id: Uuid) -> Result<Vec<DocumentType>, AppError> {
        let rows = sqlx::query_as::<Postgres, DocumentType>(concat!(
            "SELECT ",
            type_columns!(),
            " FROM document_types WHERE tenant_id = $1 AND deleted_at IS NULL ORDER BY name"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    /// Returns false when no active type matched.
    #[tracing::instrument(skip(self), fields(db.table = "document_types", db.record_id = %id))]
    pub async fn soft_delete(&self, tenant_id: Uuid, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query(
            r#"
            UPDATE document_types
            SET deleted_at = NOW(), updated_at = NOW()
            WHERE id = $1 AND tenant_id = $2 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
