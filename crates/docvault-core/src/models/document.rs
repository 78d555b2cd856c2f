use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Kind of user a document belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "subject_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubjectType {
    Student,
    Counselor,
    Admin,
    Other,
}

impl SubjectType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectType::Student => "STUDENT",
            SubjectType::Counselor => "COUNSELOR",
            SubjectType::Admin => "ADMIN",
            SubjectType::Other => "OTHER",
        }
    }
}

impl std::fmt::Display for SubjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "STUDENT" => Ok(SubjectType::Student),
            "COUNSELOR" => Ok(SubjectType::Counselor),
            "ADMIN" => Ok(SubjectType::Admin),
            "OTHER" => Ok(SubjectType::Other),
            other => Err(format!("unknown subject type: {}", other)),
        }
    }
}

/// Review status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "document_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentStatus {
    #[default]
    Draft,
    Submitted,
    Verified,
    Rejected,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Draft => "DRAFT",
            DocumentStatus::Submitted => "SUBMITTED",
            DocumentStatus::Verified => "VERIFIED",
            DocumentStatus::Rejected => "REJECTED",
        }
    }
}

impl std::str::FromStr for DocumentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Ok(DocumentStatus::Draft),
            "SUBMITTED" => Ok(DocumentStatus::Submitted),
            "VERIFIED" => Ok(DocumentStatus::Verified),
            "REJECTED" => Ok(DocumentStatus::Rejected),
            other => Err(format!("unknown document status: {}", other)),
        }
    }
}

/// Owner of a set of documents: (tenant, subject type, subject id).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub struct Subject {
    pub tenant_id: Uuid,
    pub subject_type: SubjectType,
    pub subject_id: Uuid,
}

impl Subject {
    pub fn new(tenant_id: Uuid, subject_type: SubjectType, subject_id: Uuid) -> Self {
        Self {
            tenant_id,
            subject_type,
            subject_id,
        }
    }
}

/// Reference to a stored file, relative to the permanent root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FileRef {
    pub file_path: String,
    pub original_name: String,
    pub file_size: i64,
    pub file_extension: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct Document {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub subject_type: SubjectType,
    pub subject_id: Uuid,
    pub document_type_id: Uuid,
    pub status: DocumentStatus,
    pub current_version_number: i32,
    pub current_version_id: Option<Uuid>,
    pub file_path: String,
    pub original_name: String,
    pub file_size: i64,
    pub file_extension: String,
    pub created_by: Uuid,
    pub updated_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

impl Document {
    pub fn subject(&self) -> Subject {
        Subject::new(self.tenant_id, self.subject_type, self.subject_id)
    }

    pub fn file_ref(&self) -> FileRef {
        FileRef {
            file_path: self.file_path.clone(),
            original_name: self.original_name.clone(),
            file_size: self.file_size,
            file_extension: self.file_extension.clone(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// True when the document is active and owned by `subject`.
    pub fn is_owned_by(&self, subject: &Subject) -> bool {
        !self.is_deleted() && self.subject() == *subject
    }
}

/// Immutable record of one uploaded artifact
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct DocumentVersion {
    pub id: Uuid,
    pub document_id: Uuid,
    pub version_number: i32,
    pub file_path: String,
    pub original_name: String,
    pub file_size: i64,
    pub file_extension: String,
    pub uploaded_by: Uuid,
    pub created_at: DateTime<Utc>,
}

impl DocumentVersion {
    pub fn file_ref(&self) -> FileRef {
        FileRef {
            file_path: self.file_path.clone(),
            original_name: self.original_name.clone(),
            file_size: self.file_size,
            file_extension: self.file_extension.clone(),
        }
    }
}

/// Fields for a document row created by the first ingestion.
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub subject: Subject,
    pub document_type_id: Uuid,
    pub status: DocumentStatus,
    pub created_by: Uuid,
}

/// Fields for a version row.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub version_number: i32,
    pub file: FileRef,
    pub uploaded_by: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_document(subject: Subject) -> Document {
        let now = Utc::now();
        Document {
            id: Uuid::new_v4(),
            tenant_id: subject.tenant_id,
            subject_type: subject.subject_type,
            subject_id: subject.subject_id,
            document_type_id: Uuid::new_v4(),
            status: DocumentStatus::Draft,
            current_version_number: 1,
            current_version_id: Some(Uuid::new_v4()),
            file_path: "a/STUDENT/b/c/v1_1_passport.pdf".to_string(),
            original_name: "passport.pdf".to_string(),
            file_size: 10,
            file_extension: "pdf".to_string(),
            created_by: subject.subject_id,
            updated_by: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            deleted_by: None,
        }
    }

    #[test]
    fn ownership_requires_matching_subject_and_active_row() {
        let subject = Subject::new(Uuid::new_v4(), SubjectType::Student, Uuid::new_v4());
        let mut doc = sample_document(subject);
        assert!(doc.is_owned_by(&subject));

        let other = Subject::new(subject.tenant_id, SubjectType::Counselor, subject.subject_id);
        assert!(!doc.is_owned_by(&other));

        doc.deleted_at = Some(Utc::now());
        assert!(!doc.is_owned_by(&subject));
    }

    #[test]
    fn subject_type_round_trips_through_str() {
        for t in [
            SubjectType::Student,
            SubjectType::Counselor,
            SubjectType::Admin,
            SubjectType::Other,
        ] {
            assert_eq!(t.as_str().parse::<SubjectType>(), Ok(t));
        }
        assert!("parent".parse::<SubjectType>().is_err());
    }

    #[test]
    fn status_serializes_screaming_case() {
        let json = serde_json::to_string(&DocumentStatus::Submitted).unwrap();
        assert_eq!(json, "\"SUBMITTED\"");
        assert_eq!("verified".parse::<DocumentStatus>(), Ok(DocumentStatus::Verified));
    }
}
