//! Document service coordinating extraction, summarization, assembly, and persistence.

use crate::{
    config::Config,
    extraction::Extractor,
    intake::{ScratchStore, UploadedFile},
    metrics::{MetricsSnapshot, PipelineMetrics},
    processing::{
        assemble::assemble_document,
        summarize::SummaryOrchestrator,
        types::{HealthSnapshot, PipelineError, ProcessedDocument},
    },
    storage::{DisconnectedStore, DocumentStore, SqliteDocumentStore},
    summarization::build_generation_client,
};
use async_trait::async_trait;
use std::sync::Arc;

/// Runs a staged upload through the full pipeline.
///
/// The service owns long-lived handles to the scratch store, extraction backends, generation
/// client, document store, and metrics registry. Construct it once at process start and share it
/// through an `Arc`; no state is shared between requests beyond these handles.
pub struct DocumentService {
    scratch: ScratchStore,
    extractor: Extractor,
    orchestrator: SummaryOrchestrator,
    store: Arc<dyn DocumentStore>,
    metrics: Arc<PipelineMetrics>,
}

/// Abstraction over the pipeline used by the HTTP surface.
#[async_trait]
pub trait DocumentApi: Send + Sync {
    /// Scratch storage uploads are staged into.
    fn scratch(&self) -> &ScratchStore;

    /// Extract, summarize, assemble, and optionally persist a staged upload.
    ///
    /// The upload's scratch file is gone when this returns, whatever the outcome.
    async fn process_upload(&self, upload: UploadedFile)
    -> Result<ProcessedDocument, PipelineError>;

    /// Record a request rejected before it reached the pipeline.
    fn record_rejection(&self, error: &PipelineError);

    /// Collaborator readiness for the health probe.
    fn health(&self) -> HealthSnapshot;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

impl DocumentService {
    /// Assemble a service from explicit collaborators.
    pub fn new(
        scratch: ScratchStore,
        extractor: Extractor,
        orchestrator: SummaryOrchestrator,
        store: Arc<dyn DocumentStore>,
    ) -> Self {
        Self {
            scratch,
            extractor,
            orchestrator,
            store,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Build the production service for `config`.
    ///
    /// Creates the scratch directory. A missing Gemini key is logged and every upload then fails
    /// at orchestration time; a database that cannot be opened degrades persistence to a no-op.
    pub async fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let scratch = ScratchStore::new(config.upload_dir.clone());
        scratch.ensure_dir().await?;
        tracing::debug!(dir = %scratch.dir().display(), "Scratch directory ready");

        let client = build_generation_client(config)?;
        if client.is_none() {
            tracing::warn!("GEMINI_API_KEY is not set; uploads will fail until it is configured");
        }
        let orchestrator = SummaryOrchestrator::new(client, config.generation_timeout);

        let store: Arc<dyn DocumentStore> = match config.database_path.as_deref() {
            None => {
                tracing::info!("DATABASE_PATH is not set; documents will not be persisted");
                Arc::new(DisconnectedStore)
            }
            Some(path) => match SqliteDocumentStore::open(path) {
                Ok(store) => Arc::new(store),
                Err(error) => {
                    tracing::warn!(path, error = %error, "Database unavailable; continuing without persistence");
                    Arc::new(DisconnectedStore)
                }
            },
        };

        Ok(Self::new(
            scratch,
            Extractor::from_config(config),
            orchestrator,
            store,
        ))
    }

    async fn run(&self, upload: &UploadedFile) -> Result<ProcessedDocument, PipelineError> {
        let text = self.extractor.extract(upload).await?;
        let output = self.orchestrator.summarize(&text).await?;
        let mut document = assemble_document(upload, text, output);

        if self.store.is_available() {
            document.id = self.store.save(&document).await;
        } else {
            tracing::debug!(filename = %document.filename, "Persistence unavailable; skipping save");
        }
        Ok(document)
    }
}

#[async_trait]
impl DocumentApi for DocumentService {
    fn scratch(&self) -> &ScratchStore {
        &self.scratch
    }

    async fn process_upload(
        &self,
        upload: UploadedFile,
    ) -> Result<ProcessedDocument, PipelineError> {
        tracing::info!(
            filename = upload.filename(),
            mime_type = upload.mime_type(),
            size_bytes = upload.size_bytes(),
            "Processing upload"
        );
        let result = self.run(&upload).await;

        let filename = upload.filename().to_string();
        if let Err(error) = upload.discard().await {
            tracing::warn!(filename = %filename, error = %error, "Failed to remove scratch file");
        }

        match &result {
            Ok(document) => {
                self.metrics.record_success(document.id.is_some());
                tracing::info!(
                    filename = %filename,
                    persisted = document.id.is_some(),
                    key_points = document.key_points.len(),
                    "Upload processed"
                );
            }
            Err(error) => self.record_rejection(error),
        }
        result
    }

    fn record_rejection(&self, error: &PipelineError) {
        self.metrics.record_failure();
        if error.is_client_error() {
            tracing::warn!(error = %error, "Upload rejected");
        } else {
            tracing::error!(error = %error, "Upload failed");
        }
    }

    fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            database_connected: self.store.is_available(),
            gemini_configured: self.orchestrator.is_configured(),
        }
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}
