use super::{DocumentStore, StorageError};
use crate::processing::{ProcessedDocument, SummarySet};
use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS documents (
        id TEXT PRIMARY KEY,
        filename TEXT NOT NULL,
        original_name TEXT NOT NULL,
        mime_type TEXT NOT NULL,
        extracted_text TEXT NOT NULL,
        summaries TEXT NOT NULL,
        key_points TEXT NOT NULL,
        created_at TEXT NOT NULL
    );
"#;

/// SQLite-backed document store.
///
/// Summaries and key points are stored as JSON text columns; one row per processed document.
#[derive(Clone)]
pub struct SqliteDocumentStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDocumentStore {
    /// Open (or create) the database at `path` and ensure the schema exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!(path = %path.display(), "Document database ready");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Insert `document` under a fresh identifier.
    pub async fn insert(&self, document: &ProcessedDocument) -> Result<String, StorageError> {
        let id = Uuid::new_v4().to_string();
        let summaries = serde_json::to_string(&document.summaries)?;
        let key_points = serde_json::to_string(&document.key_points)?;
        let record = document.clone();
        let conn = Arc::clone(&self.conn);
        let row_id = id.clone();

        run_blocking(move || {
            let conn = conn.lock().map_err(|_| StorageError::Poisoned)?;
            conn.execute(
                "INSERT INTO documents (id, filename, original_name, mime_type, extracted_text, summaries, key_points, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    row_id,
                    record.filename,
                    record.original_name,
                    record.mime_type,
                    record.extracted_text,
                    summaries,
                    key_points,
                    record.created_at,
                ],
            )?;
            Ok(())
        })
        .await?;

        Ok(id)
    }

    /// Read a stored document back by identifier.
    pub async fn fetch(&self, id: &str) -> Result<Option<ProcessedDocument>, StorageError> {
        let conn = Arc::clone(&self.conn);
        let id = id.to_string();

        run_blocking(move || {
            let conn = conn.lock().map_err(|_| StorageError::Poisoned)?;
            let row = conn
                .query_row(
                    "SELECT id, filename, original_name, mime_type, extracted_text, summaries, key_points, created_at
                     FROM documents WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, String>(6)?,
                            row.get::<_, String>(7)?,
                        ))
                    },
                )
                .optional()?;

            let Some((
                id,
                filename,
                original_name,
                mime_type,
                extracted_text,
                summaries,
                key_points,
                created_at,
            )) = row
            else {
                return Ok(None);
            };

            Ok(Some(ProcessedDocument {
                id: Some(id),
                filename,
                original_name,
                mime_type,
                extracted_text,
                summaries: serde_json::from_str::<SummarySet>(&summaries)?,
                key_points: serde_json::from_str(&key_points)?,
                created_at,
            }))
        })
        .await
    }
}

async fn run_blocking<T, F>(task: F) -> Result<T, StorageError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, StorageError> + Send + 'static,
{
    tokio::task::spawn_blocking(task)
        .await
        .map_err(|error| StorageError::Task(error.to_string()))?
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    fn is_available(&self) -> bool {
        true
    }

    async fn save(&self, document: &ProcessedDocument) -> Option<String> {
        match self.insert(document).await {
            Ok(id) => {
                tracing::info!(id = %id, filename = %document.filename, "Document persisted");
                Some(id)
            }
            Err(error) => {
                tracing::warn!(error = %error, filename = %document.filename, "Failed to persist document");
                None
            }
        }
    }
}
