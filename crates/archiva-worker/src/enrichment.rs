//! Translation enrichment
//!
//! Runs after an asset is persisted and visible. Each job is a detached task
//! with its own deadline: the ingest response never waits for it, and the
//! request going away does not cancel it. Only process shutdown does, and
//! shutdown waits for cancelled jobs to write their outcome. Whatever happens,
//! the outcome is written back so the asset leaves the `translating` stage.

use std::sync::Arc;
use std::time::Duration;

use archiva_core::{IngestionStage, Locale, LocalizedText, TranslationRecord, TranslationStatus};
use archiva_db::{AssetStore, PersistenceResult};
use archiva_services::{TextField, TranslationContext, TranslationError, Translator};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::Instrument;
use uuid::Uuid;

/// Error recorded when no translation backend is configured.
pub const TRANSLATION_NOT_CONFIGURED: &str = "translation not configured";

#[derive(Debug, Clone)]
pub struct EnrichmentJob {
    pub asset_id: Uuid,
    pub platform: String,
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct EnrichmentWorker {
    store: Arc<dyn AssetStore>,
    translator: Option<Arc<dyn Translator>>,
    timeout: Duration,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl EnrichmentWorker {
    pub fn new(
        store: Arc<dyn AssetStore>,
        translator: Option<Arc<dyn Translator>>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            translator,
            timeout,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.translator.is_some()
    }

    /// Cancel in-flight jobs and wait up to `grace` for them to record their
    /// `failed` status. Returns `false` if some job was still running.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tracker.close();
        self.shutdown.cancel();
        let pending = self.tracker.len();
        match tokio::time::timeout(grace, self.tracker.wait()).await {
            Ok(()) => {
                tracing::info!(jobs = pending, "Enrichment jobs drained");
                true
            }
            Err(_) => {
                tracing::warn!(
                    jobs = self.tracker.len(),
                    grace = ?grace,
                    "Enrichment jobs still running at shutdown"
                );
                false
            }
        }
    }

    /// Run `job` in the background.
    pub fn spawn(&self, job: EnrichmentJob) -> JoinHandle<()> {
        let worker = self.clone();
        let span = tracing::info_span!("enrichment", asset.id = %job.asset_id);
        self.tracker.spawn(
            async move {
                let asset_id = job.asset_id;
                match worker.enrich(job).await {
                    Ok(status) => {
                        tracing::info!(translation.status = %status, "Enrichment recorded")
                    }
                    Err(e) => tracing::error!(
                        asset.id = %asset_id,
                        error = %e,
                        "Failed to record enrichment outcome"
                    ),
                }
            }
            .instrument(span),
        )
    }

    /// Translate and record the outcome, moving the asset to `ready`.
    pub async fn enrich(&self, job: EnrichmentJob) -> PersistenceResult<TranslationStatus> {
        let (status, record) = self.translate(&job).await;
        if let Some(ref error) = record.error {
            tracing::warn!(
                asset.id = %job.asset_id,
                translation.status = %status,
                error = %error,
                "Translation did not complete"
            );
        }
        self.store
            .record_translation(job.asset_id, status, &record, IngestionStage::Ready)
            .await?;
        Ok(status)
    }

    async fn translate(&self, job: &EnrichmentJob) -> (TranslationStatus, TranslationRecord) {
        let title = non_blank(job.title.as_deref());
        let description = non_blank(job.description.as_deref());

        if title.is_none() && description.is_none() {
            return (TranslationStatus::Skipped, TranslationRecord::default());
        }

        let untranslated = TranslationRecord {
            title_by_locale: source_only(title),
            description_by_locale: source_only(description),
            model: None,
            error: None,
        };

        let Some(translator) = self.translator.as_deref() else {
            return (
                TranslationStatus::Skipped,
                TranslationRecord {
                    error: Some(TRANSLATION_NOT_CONFIGURED.to_string()),
                    ..untranslated
                },
            );
        };

        let both = async {
            tokio::join!(
                translate_field(translator, title, TextField::Title, &job.platform),
                translate_field(translator, description, TextField::Description, &job.platform),
            )
        };

        let outcome = tokio::select! {
            _ = self.shutdown.cancelled() => Err("translation cancelled by shutdown".to_string()),
            result = tokio::time::timeout(self.timeout, both) => result.map_err(|_| {
                format!("translation timed out after {}s", self.timeout.as_secs())
            }),
        };

        let mut record = TranslationRecord {
            model: Some(translator.model().to_string()),
            ..untranslated
        };

        let (title_result, description_result) = match outcome {
            Ok(results) => results,
            Err(error) => {
                record.error = Some(error);
                return (TranslationStatus::Failed, record);
            }
        };

        let mut errors = Vec::new();
        match title_result {
            Ok(Some(localized)) => record.title_by_locale = localized,
            Ok(None) => {}
            Err(e) => errors.push(format!("title: {}", e)),
        }
        match description_result {
            Ok(Some(localized)) => record.description_by_locale = localized,
            Ok(None) => {}
            Err(e) => errors.push(format!("description: {}", e)),
        }

        if errors.is_empty() {
            (TranslationStatus::Completed, record)
        } else {
            record.error = Some(errors.join("; "));
            (TranslationStatus::Failed, record)
        }
    }
}

async fn translate_field(
    translator: &dyn Translator,
    text: Option<&str>,
    field: TextField,
    platform: &str,
) -> Result<Option<LocalizedText>, TranslationError> {
    let Some(text) = text else {
        return Ok(None);
    };
    let context = TranslationContext::for_text(platform, field, text);
    translator
        .translate(text, &Locale::ALL, &context)
        .await
        .map(Some)
}

fn non_blank(text: Option<&str>) -> Option<&str> {
    text.map(str::trim).filter(|t| !t.is_empty())
}

fn source_only(text: Option<&str>) -> LocalizedText {
    text.map(|t| LocalizedText::from_source(Locale::detect(t), t))
        .unwrap_or_default()
}
