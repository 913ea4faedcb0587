use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_processed: AtomicU64,
    documents_failed: AtomicU64,
    documents_persisted: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a document that completed the pipeline, noting whether it was stored.
    pub fn record_success(&self, persisted: bool) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        if persisted {
            self.documents_persisted.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Record a request that ended in an error response.
    pub fn record_failure(&self) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_processed: self.documents_processed.load(Ordering::Relaxed),
            documents_failed: self.documents_failed.load(Ordering::Relaxed),
            documents_persisted: self.documents_persisted.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Documents that produced a full result since startup.
    pub documents_processed: u64,
    /// Uploads that ended in an error response.
    pub documents_failed: u64,
    /// Successful documents that were also written to storage.
    pub documents_persisted: u64,
}
