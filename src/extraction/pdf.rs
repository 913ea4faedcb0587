use super::ExtractionError;
use async_trait::async_trait;

/// Converts PDF bytes into plain text.
#[async_trait]
pub trait PdfBackend: Send + Sync {
    /// Extract the concatenated text of every page.
    async fn extract_text(&self, bytes: Vec<u8>) -> Result<String, ExtractionError>;
}

/// PDF backend built on the `pdf-extract` crate.
///
/// Parsing is CPU-bound and can stall on unusual fonts, so it runs on the blocking pool. Blocking
/// tasks cannot be aborted: when the caller gives up on a slow parse, the parse still runs to
/// completion and its result is discarded.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfExtractBackend;

#[async_trait]
impl PdfBackend for PdfExtractBackend {
    async fn extract_text(&self, bytes: Vec<u8>) -> Result<String, ExtractionError> {
        let size = bytes.len();
        let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
            .await
            .map_err(|error| ExtractionError::Pdf(format!("extraction task failed: {error}")))?
            .map_err(|error| ExtractionError::Pdf(error.to_string()))?;
        tracing::debug!(bytes = size, characters = text.len(), "pdf-extract finished");
        Ok(text)
    }
}
