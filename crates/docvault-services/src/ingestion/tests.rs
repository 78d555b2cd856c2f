use super::*;
use crate::test_helpers::{FlakyStorage, MockDocumentStore, MockDocumentTypeLookup};
use docvault_core::constants::ACTIVE_DOCUMENT_UNIQUE_INDEX;
use docvault_core::models::{
    AuditAction, Document, DocumentStatus, DocumentType, Subject, SubjectType,
};
use docvault_core::{AppError, ErrorKind, ErrorMetadata, RetentionPolicy};
use docvault_storage::{DocumentStorage, PermanentStorage, StagingStore};
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

struct Harness {
    _dir: TempDir,
    store: MockDocumentStore,
    types: MockDocumentTypeLookup,
    storage: FlakyStorage,
    coordinator: IngestionCoordinator,
    subject: Subject,
}

impl Harness {
    async fn new() -> Self {
        Self::with_retention(RetentionPolicy::Keep).await
    }

    async fn with_retention(retention: RetentionPolicy) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let staging = StagingStore::new(dir.path().join("temp")).await.unwrap();
        let permanent = PermanentStorage::new(dir.path().join("permanent"))
            .await
            .unwrap();
        let storage = FlakyStorage::new(permanent);
        let store = MockDocumentStore::new();
        let types = MockDocumentTypeLookup::new();

        let coordinator = IngestionCoordinator::new(
            Arc::new(store.clone()),
            Arc::new(types.clone()),
            staging,
            Arc::new(storage.clone()),
        )
        .with_retention(retention);

        Self {
            _dir: dir,
            store,
            types,
            storage,
            coordinator,
            subject: Subject::new(Uuid::new_v4(), SubjectType::Student, Uuid::new_v4()),
        }
    }

    fn add_type(&self, name: &str, extensions: &[&str]) -> DocumentType {
        self.types.add_type(self.subject.tenant_id, name, extensions)
    }

    async fn stage(&self, original_name: &str) -> String {
        self.coordinator
            .staging()
            .stage(original_name.as_bytes(), original_name)
            .await
            .unwrap()
            .staged_path
    }

    async fn item(&self, document_type_id: Uuid, original_name: &str) -> DocumentItem {
        DocumentItem {
            document_type_id,
            staged_path: self.stage(original_name).await,
            original_name: original_name.to_string(),
        }
    }

    fn create_request(&self, documents: Vec<DocumentItem>) -> CreateDocumentsRequest {
        CreateDocumentsRequest {
            subject: self.subject,
            actor_id: self.subject.subject_id,
            documents,
        }
    }

    async fn replace_request(&self, document_id: Uuid, original_name: &str) -> ReplaceDocumentRequest {
        ReplaceDocumentRequest {
            subject: self.subject,
            actor_id: self.subject.subject_id,
            document_id,
            staged_path: self.stage(original_name).await,
            original_name: original_name.to_string(),
        }
    }

    fn delete_request(&self, document_id: Uuid, purge_all_versions: bool) -> DeleteDocumentRequest {
        DeleteDocumentRequest {
            subject: self.subject,
            actor_id: self.subject.subject_id,
            document_id,
            purge_all_versions,
        }
    }

    async fn staged_count(&self) -> usize {
        self.coordinator.staging().list().await.unwrap().len()
    }

    async fn permanent_exists(&self, file_path: &str) -> bool {
        self.storage.exists(file_path).await.unwrap()
    }

    async fn create_one(&self, document_type: &DocumentType, original_name: &str) -> Document {
        let item = self.item(document_type.id, original_name).await;
        let mut created = self
            .coordinator
            .create_documents(self.create_request(vec![item]))
            .await
            .unwrap();
        created.remove(0)
    }
}

#[tokio::test]
async fn create_assigns_version_one_and_promotes() {
    let h = Harness::new().await;
    let passport = h.add_type("Passport", &["pdf", "jpg"]);
    let item = h.item(passport.id, "My Passport.pdf").await;
    let staged_path = item.staged_path.clone();

    let created = h
        .coordinator
        .create_documents(h.create_request(vec![item]))
        .await
        .unwrap();

    assert_eq!(created.len(), 1);
    let document = &created[0];
    assert_eq!(document.current_version_number, 1);
    assert_eq!(document.status, DocumentStatus::Draft);
    assert_eq!(document.file_extension, "pdf");
    assert_eq!(document.file_size, "My Passport.pdf".len() as i64);

    let versions = h.store.versions_of(document.id);
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].version_number, 1);
    assert_eq!(document.current_version_id, Some(versions[0].id));

    let prefix = format!(
        "{}/STUDENT/{}/{}/v1_",
        h.subject.tenant_id, h.subject.subject_id, passport.id
    );
    assert!(document.file_path.starts_with(&prefix));
    assert!(document.file_path.ends_with("_My_Passport.pdf"));

    assert!(h.permanent_exists(&document.file_path).await);
    assert!(!h.coordinator.staging().exists(&staged_path).await);

    let audit = h.store.audit_of(document.id);
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].action, AuditAction::Uploaded);
    assert_eq!(audit[0].metadata["originalName"], "My Passport.pdf");
}

#[tokio::test]
async fn replace_appends_next_version_and_keeps_previous_file() {
    let h = Harness::new().await;
    let cv = h.add_type("CV", &[]);
    let first = h.create_one(&cv, "cv.pdf").await;

    let request = h.replace_request(first.id, "cv-2024.docx").await;
    let updated = h.coordinator.replace_document(request).await.unwrap();

    assert_eq!(updated.id, first.id);
    assert_eq!(updated.current_version_number, 2);
    assert_eq!(updated.file_extension, "docx");
    assert_eq!(updated.status, DocumentStatus::Draft);

    let versions = h.store.versions_of(first.id);
    let numbers: Vec<i32> = versions.iter().map(|v| v.version_number).collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(updated.file_path, versions[1].file_path);
    assert_eq!(updated.current_version_id, Some(versions[1].id));

    assert!(h.permanent_exists(&updated.file_path).await);
    assert!(h.permanent_exists(&first.file_path).await);

    let audit = h.store.audit_of(first.id);
    assert_eq!(audit.last().unwrap().action, AuditAction::Updated);
    assert_eq!(audit.last().unwrap().metadata["previousVersion"], 1);
    assert_eq!(
        audit.last().unwrap().metadata["previousFilePath"],
        first.file_path.as_str()
    );
}

#[tokio::test]
async fn replace_with_delete_previous_removes_old_file() {
    let h = Harness::with_retention(RetentionPolicy::DeletePrevious).await;
    let cv = h.add_type("CV", &[]);
    let first = h.create_one(&cv, "cv.pdf").await;

    let request = h.replace_request(first.id, "cv.pdf").await;
    let updated = h.coordinator.replace_document(request).await.unwrap();

    assert!(h.permanent_exists(&updated.file_path).await);
    assert!(!h.permanent_exists(&first.file_path).await);
}

#[tokio::test]
async fn replace_of_foreign_document_is_not_found_and_discards_upload() {
    let h = Harness::new().await;
    let cv = h.add_type("CV", &[]);
    let first = h.create_one(&cv, "cv.pdf").await;

    let mut request = h.replace_request(first.id, "cv.pdf").await;
    request.subject = Subject::new(h.subject.tenant_id, SubjectType::Student, Uuid::new_v4());
    let staged_path = request.staged_path.clone();

    let err = h.coordinator.replace_document(request).await.unwrap_err();
    assert!(matches!(err, AppError::DocumentNotFound { document_id } if document_id == first.id));
    assert!(!h.coordinator.staging().exists(&staged_path).await);
    assert_eq!(h.store.versions_of(first.id).len(), 1);
}

#[tokio::test]
async fn replace_checks_extension_against_document_type() {
    let h = Harness::new().await;
    let photo = h.add_type("Photo", &["jpg"]);
    let first = h.create_one(&photo, "me.jpg").await;

    let request = h.replace_request(first.id, "me.png").await;
    let err = h.coordinator.replace_document(request).await.unwrap_err();

    assert!(matches!(err, AppError::ExtensionNotAllowed { .. }));
    assert_eq!(h.staged_count().await, 0);
}

#[tokio::test]
async fn replace_after_type_removed_skips_extension_check() {
    let h = Harness::new().await;
    let photo = h.add_type("Photo", &["jpg"]);
    let first = h.create_one(&photo, "me.jpg").await;
    h.types.remove_type(photo.id);

    let request = h.replace_request(first.id, "me.png").await;
    let updated = h.coordinator.replace_document(request).await.unwrap();

    assert_eq!(updated.current_version_number, 2);
    assert_eq!(updated.file_extension, "png");
    assert!(h.permanent_exists(&updated.file_path).await);
}

#[tokio::test]
async fn stored_extension_matches_permanent_path() {
    let h = Harness::new().await;
    let report = h.add_type("Report", &[]);
    let photo = h.add_type("Photo", &["jpg"]);

    let long = h.create_one(&report, "report.documentation1234").await;
    assert_eq!(long.file_extension, "documentat");
    assert!(long.file_path.ends_with("_report.documentat"));

    let odd = h.create_one(&photo, "photo.j$pg").await;
    assert_eq!(odd.file_extension, "jpg");
    assert!(odd.file_path.ends_with("_photo.jpg"));
    assert_eq!(h.store.versions_of(odd.id)[0].file_extension, "jpg");
}

#[tokio::test]
async fn extension_allow_list_is_case_insensitive() {
    let h = Harness::new().await;
    let transcript = h.add_type("Academic Transcripts", &["pdf", "jpg"]);

    let bad = h.item(transcript.id, "transcript.exe").await;
    let err = h
        .coordinator
        .create_documents(h.create_request(vec![bad]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    match &err {
        AppError::ExtensionNotAllowed {
            original_name,
            extension,
            ..
        } => {
            assert_eq!(original_name, "transcript.exe");
            assert_eq!(extension, "exe");
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.client_message().contains("transcript.exe"));
    assert_eq!(h.store.document_count(), 0);

    let good = h.item(transcript.id, "TRANSCRIPT.PDF").await;
    let created = h
        .coordinator
        .create_documents(h.create_request(vec![good]))
        .await
        .unwrap();
    assert_eq!(created[0].file_extension, "pdf");
}

#[tokio::test]
async fn invalid_type_in_batch_discards_every_staged_file() {
    let h = Harness::new().await;
    let passport = h.add_type("Passport", &[]);
    let cv = h.add_type("CV", &[]);

    let first = h.item(passport.id, "passport.pdf").await;
    let second = h.item(Uuid::new_v4(), "unknown.pdf").await;
    let third = h.item(cv.id, "cv.pdf").await;
    assert_eq!(h.staged_count().await, 3);

    let err = h
        .coordinator
        .create_documents(h.create_request(vec![first, second.clone(), third]))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        AppError::DocumentTypeNotFound { document_type_id } if document_type_id == second.document_type_id
    ));
    assert_eq!(h.staged_count().await, 0);
    assert_eq!(h.store.document_count(), 0);

    let retry = vec![
        h.item(passport.id, "passport.pdf").await,
        h.item(cv.id, "cv.pdf").await,
    ];
    let created = h
        .coordinator
        .create_documents(h.create_request(retry))
        .await
        .unwrap();
    assert_eq!(created.len(), 2);
    assert_eq!(h.staged_count().await, 0);
}

#[tokio::test]
async fn type_of_another_tenant_is_not_found() {
    let h = Harness::new().await;
    let foreign = h.types.add_type(Uuid::new_v4(), "Passport", &[]);
    let item = h.item(foreign.id, "passport.pdf").await;

    let err = h
        .coordinator
        .create_documents(h.create_request(vec![item]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn missing_staged_file_fails_whole_batch() {
    let h = Harness::new().await;
    let passport = h.add_type("Passport", &[]);
    let cv = h.add_type("CV", &[]);

    let present = h.item(passport.id, "passport.pdf").await;
    let missing = DocumentItem {
        document_type_id: cv.id,
        staged_path: "0123456789abcdef.pdf".to_string(),
        original_name: "cv.pdf".to_string(),
    };

    let err = h
        .coordinator
        .create_documents(h.create_request(vec![present, missing]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::TempFileMissing { ref staged_path } if staged_path == "0123456789abcdef.pdf"));
    assert_eq!(h.staged_count().await, 0);
    assert_eq!(h.store.document_count(), 0);
}

#[tokio::test]
async fn empty_batch_is_a_validation_error() {
    let h = Harness::new().await;
    let err = h
        .coordinator
        .create_documents(h.create_request(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn duplicate_conflicts_until_soft_deleted() {
    let h = Harness::new().await;
    let passport = h.add_type("Passport", &[]);
    let first = h.create_one(&passport, "passport.pdf").await;

    let again = h.item(passport.id, "passport.pdf").await;
    let err = h
        .coordinator
        .create_documents(h.create_request(vec![again]))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Conflict);
    assert!(matches!(err, AppError::DocumentAlreadyExists { .. }));
    assert_eq!(h.staged_count().await, 0);

    h.coordinator
        .delete_document(h.delete_request(first.id, false))
        .await
        .unwrap();

    let second = h.create_one(&passport, "passport.pdf").await;
    assert_ne!(second.id, first.id);
    assert_eq!(second.current_version_number, 1);
}

#[tokio::test]
async fn same_type_twice_in_one_batch_conflicts() {
    let h = Harness::new().await;
    let passport = h.add_type("Passport", &[]);
    let items = vec![
        h.item(passport.id, "a.pdf").await,
        h.item(passport.id, "b.pdf").await,
    ];

    let err = h
        .coordinator
        .create_documents(h.create_request(items))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DocumentAlreadyExists { .. }));
    assert_eq!(h.store.document_count(), 0);
    assert_eq!(h.staged_count().await, 0);
}

#[tokio::test]
async fn lost_race_on_active_index_maps_to_already_exists() {
    let h = Harness::new().await;
    let passport = h.add_type("Passport", &[]);
    h.store.fail_next_create(AppError::UniqueViolation {
        constraint: Some(ACTIVE_DOCUMENT_UNIQUE_INDEX.to_string()),
        message: "duplicate key".to_string(),
    });

    let item = h.item(passport.id, "passport.pdf").await;
    let err = h
        .coordinator
        .create_documents(h.create_request(vec![item]))
        .await
        .unwrap_err();

    match err {
        AppError::DocumentAlreadyExists {
            document_type_id,
            document_type,
        } => {
            assert_eq!(document_type_id, passport.id);
            assert_eq!(document_type.as_deref(), Some("Passport"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(h.staged_count().await, 0);
}

#[tokio::test]
async fn promotion_failure_reports_committed_document() {
    let h = Harness::new().await;
    let passport = h.add_type("Passport", &[]);
    let cv = h.add_type("CV", &[]);
    h.storage.fail_promotions(true);

    let items = vec![
        h.item(passport.id, "passport.pdf").await,
        h.item(cv.id, "cv.pdf").await,
    ];
    let err = h
        .coordinator
        .create_documents(h.create_request(items))
        .await
        .unwrap_err();

    let (document_id, permanent_path, committed) = match err {
        AppError::Promotion {
            document_id,
            permanent_path,
            committed_document_ids,
            ..
        } => (document_id, permanent_path, committed_document_ids),
        other => panic!("unexpected error: {:?}", other),
    };

    assert_eq!(committed, vec![document_id]);
    let document = h.store.get(document_id).unwrap();
    assert_eq!(document.file_path, permanent_path);
    assert_eq!(document.document_type_id, passport.id);
    // The second item never reached the database and its bytes are gone.
    assert_eq!(h.store.document_count(), 1);
    assert_eq!(h.staged_count().await, 0);

    let dangling = h
        .coordinator
        .find_dangling_documents(h.subject.tenant_id)
        .await
        .unwrap();
    assert_eq!(dangling.len(), 1);
    assert_eq!(dangling[0].document_id, document_id);
    assert_eq!(dangling[0].file_path, permanent_path);
}

#[tokio::test]
async fn dangling_report_ignores_healthy_documents() {
    let h = Harness::new().await;
    let passport = h.add_type("Passport", &[]);
    h.create_one(&passport, "passport.pdf").await;

    let dangling = h
        .coordinator
        .find_dangling_documents(h.subject.tenant_id)
        .await
        .unwrap();
    assert!(dangling.is_empty());
}

#[tokio::test]
async fn delete_removes_file_then_soft_deletes() {
    let h = Harness::new().await;
    let passport = h.add_type("Passport", &[]);
    let document = h.create_one(&passport, "passport.pdf").await;

    let deleted = h
        .coordinator
        .delete_document(h.delete_request(document.id, false))
        .await
        .unwrap();

    assert!(deleted.is_deleted());
    assert_eq!(deleted.deleted_by, Some(h.subject.subject_id));
    assert!(!h.permanent_exists(&document.file_path).await);

    let audit = h.store.audit_of(document.id);
    assert_eq!(audit.last().unwrap().action, AuditAction::Deleted);
    assert_eq!(
        audit.last().unwrap().metadata["filePath"],
        document.file_path.as_str()
    );

    let err = h
        .coordinator
        .get_document(&h.subject, document.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DocumentNotFound { .. }));

    let err = h
        .coordinator
        .delete_document(h.delete_request(document.id, false))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::DocumentNotFound { .. }));
}

#[tokio::test]
async fn delete_tolerates_missing_file() {
    let h = Harness::new().await;
    let passport = h.add_type("Passport", &[]);
    let document = h.create_one(&passport, "passport.pdf").await;
    h.storage.delete(&document.file_path).await.unwrap();

    let deleted = h
        .coordinator
        .delete_document(h.delete_request(document.id, false))
        .await
        .unwrap();
    assert!(deleted.is_deleted());
}

#[tokio::test]
async fn delete_with_purge_removes_every_version() {
    let h = Harness::new().await;
    let cv = h.add_type("CV", &[]);
    let first = h.create_one(&cv, "cv.pdf").await;
    let request = h.replace_request(first.id, "cv.pdf").await;
    let second = h.coordinator.replace_document(request).await.unwrap();
    assert!(h.permanent_exists(&first.file_path).await);

    h.coordinator
        .delete_document(h.delete_request(first.id, true))
        .await
        .unwrap();

    assert!(!h.permanent_exists(&first.file_path).await);
    assert!(!h.permanent_exists(&second.file_path).await);
}

#[tokio::test]
async fn change_status_updates_and_ignores_repeats() {
    let h = Harness::new().await;
    let passport = h.add_type("Passport", &[]);
    let document = h.create_one(&passport, "passport.pdf").await;
    let reviewer = Uuid::new_v4();

    let request = ChangeStatusRequest {
        tenant_id: h.subject.tenant_id,
        actor_id: reviewer,
        document_id: document.id,
        status: DocumentStatus::Verified,
    };
    let verified = h.coordinator.change_status(request.clone()).await.unwrap();
    assert_eq!(verified.status, DocumentStatus::Verified);
    assert_eq!(verified.updated_by, Some(reviewer));

    let again = h.coordinator.change_status(request).await.unwrap();
    assert_eq!(again.status, DocumentStatus::Verified);

    let missing = ChangeStatusRequest {
        tenant_id: h.subject.tenant_id,
        actor_id: reviewer,
        document_id: Uuid::new_v4(),
        status: DocumentStatus::Rejected,
    };
    assert!(matches!(
        h.coordinator.change_status(missing).await.unwrap_err(),
        AppError::DocumentNotFound { .. }
    ));
}

#[tokio::test]
async fn list_documents_returns_active_only() {
    let h = Harness::new().await;
    let passport = h.add_type("Passport", &[]);
    let cv = h.add_type("CV", &[]);
    let kept = h.create_one(&passport, "passport.pdf").await;
    let removed = h.create_one(&cv, "cv.pdf").await;
    h.coordinator
        .delete_document(h.delete_request(removed.id, false))
        .await
        .unwrap();

    let documents = h.coordinator.list_documents(&h.subject).await.unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].id, kept.id);
}
