//! Optional best-effort persistence of processed documents.
//!
//! Callers ask [`DocumentStore::is_available`] before saving and never see a storage error: a
//! failed save is logged by the store and reported as `None`, which the response reflects only
//! by omitting the document identifier.

mod sqlite;

pub use sqlite::SqliteDocumentStore;

use crate::processing::ProcessedDocument;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised inside storage backends.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The SQLite driver rejected an operation.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored JSON column could not be encoded or decoded.
    #[error("Failed to encode stored document: {0}")]
    Encoding(#[from] serde_json::Error),
    /// The database directory could not be prepared.
    #[error("Storage I/O failure: {0}")]
    Io(#[from] std::io::Error),
    /// The connection lock was poisoned by a panicking writer.
    #[error("Database connection lock poisoned")]
    Poisoned,
    /// The blocking storage task did not complete.
    #[error("Storage task failed: {0}")]
    Task(String),
}

/// Capability-checked persistence collaborator.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Whether saves should be attempted at all.
    fn is_available(&self) -> bool;

    /// Persist `document`, returning its identifier, or `None` if the save failed.
    async fn save(&self, document: &ProcessedDocument) -> Option<String>;
}

/// Store used when no database is configured or it could not be opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisconnectedStore;

#[async_trait]
impl DocumentStore for DisconnectedStore {
    fn is_available(&self) -> bool {
        false
    }

    async fn save(&self, _document: &ProcessedDocument) -> Option<String> {
        None
    }
}
