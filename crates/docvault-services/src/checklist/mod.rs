//! Best-effort push of a subject's document checklist to the user service.

use docvault_core::models::Subject;
use docvault_core::ChecklistConfig;
use docvault_db::DocumentStore;
use regex::{Captures, Regex};
use serde_json::{json, Map, Value};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

static SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+(.)").expect("separator pattern is valid"));

/// "Academic Transcripts" -> "academicTranscripts", "CV" -> "cv".
pub fn to_camel_case(name: &str) -> String {
    let lower = name.to_lowercase();
    SEPARATOR
        .replace_all(&lower, |caps: &Captures| caps[1].to_uppercase())
        .into_owned()
}

/// `{"academicTranscripts": true, ...}` for the given document type names.
pub fn build_checklist<S: AsRef<str>>(document_type_names: &[S]) -> Value {
    let checklist: Map<String, Value> = document_type_names
        .iter()
        .map(|name| (to_camel_case(name.as_ref()), Value::Bool(true)))
        .collect();
    Value::Object(checklist)
}

#[derive(Clone)]
pub struct ChecklistSyncService {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
    documents: Arc<dyn DocumentStore>,
}

impl ChecklistSyncService {
    pub fn new(base_url: String, timeout: Duration, documents: Arc<dyn DocumentStore>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            documents,
        }
    }

    /// `None` when no user service is configured.
    pub fn from_config(config: &ChecklistConfig, documents: Arc<dyn DocumentStore>) -> Option<Self> {
        config
            .base_url
            .as_ref()
            .map(|url| Self::new(url.clone(), config.timeout, documents))
    }

    pub fn checklist_url(&self, subject_id: uuid::Uuid) -> String {
        format!(
            "{}/student/profile/documents/checklist/{}",
            self.base_url, subject_id
        )
    }

    /// Fire-and-forget sync on the runtime.
    pub fn spawn_sync(self: &Arc<Self>, subject: Subject) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.sync(&subject).await;
        });
    }

    /// Push the checklist. Failures are logged and swallowed.
    #[tracing::instrument(skip(self), fields(subject_id = %subject.subject_id))]
    pub async fn sync(&self, subject: &Subject) {
        if let Err(e) = self.try_sync(subject).await {
            tracing::error!(error = %e, "Failed to sync document checklist");
        }
    }

    async fn try_sync(&self, subject: &Subject) -> anyhow::Result<()> {
        let mut names = self.documents.list_active_type_names(subject).await?;
        names.sort();
        names.dedup();

        let url = self.checklist_url(subject.subject_id);
        let checklist = build_checklist(&names);
        tracing::info!(url = %url, checklist = %checklist, "Syncing document checklist");

        self.client
            .patch(&url)
            .timeout(self.timeout)
            .json(&json!({ "checklist": checklist }))
            .send()
            .await?
            .error_for_status()?;

        tracing::info!("Document checklist synced");
        Ok(())
    }
}
