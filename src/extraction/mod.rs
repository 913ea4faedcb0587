//! Text extraction for staged uploads.
//!
//! The extractor dispatches purely on the upload's MIME type: PDFs go to the PDF backend and
//! images go to the OCR backend. Both backends sit behind traits so the pipeline can be
//! exercised without `tesseract` or real PDF fixtures.

mod ocr;
mod pdf;

pub use ocr::{OcrBackend, TesseractOcr};
pub use pdf::{PdfBackend, PdfExtractBackend};

use crate::config::Config;
use crate::intake::UploadedFile;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while turning an upload into plain text.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The PDF backend failed to parse the document.
    #[error("PDF extraction failed: {0}")]
    Pdf(String),
    /// The OCR backend failed to recognize the image.
    #[error("OCR failed: {0}")]
    Ocr(String),
    /// The upload's type has no extraction route.
    #[error("Unsupported file type for extraction: {0}")]
    UnsupportedType(String),
    /// The staged file could not be read.
    #[error("Failed to read uploaded file: {0}")]
    Io(#[from] std::io::Error),
    /// The backend did not finish within the configured bound.
    #[error("Text extraction timed out after {0:?}")]
    TimedOut(Duration),
    /// Extraction succeeded but produced only whitespace.
    #[error("No text found")]
    NoText,
}

/// Routes uploads to the PDF or OCR backend.
#[derive(Clone)]
pub struct Extractor {
    pdf: Arc<dyn PdfBackend>,
    ocr: Arc<dyn OcrBackend>,
    language: String,
    timeout: Duration,
}

impl Extractor {
    /// Assemble an extractor from explicit backends.
    pub fn new(
        pdf: Arc<dyn PdfBackend>,
        ocr: Arc<dyn OcrBackend>,
        language: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            pdf,
            ocr,
            language: language.into(),
            timeout,
        }
    }

    /// Production extractor: `pdf-extract` for PDFs and the `tesseract` CLI for images.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            Arc::new(PdfExtractBackend),
            Arc::new(TesseractOcr::new(config.tesseract_path.clone())),
            config.ocr_language.clone(),
            config.extraction_timeout,
        )
    }

    /// Extract plain text from a staged upload.
    ///
    /// Whitespace-only output is reported as [`ExtractionError::NoText`] so callers can tell
    /// "nothing to read" apart from a crashed backend.
    ///
    /// The timeout only stops waiting. A PDF parse already running on the blocking pool is not
    /// cancelled and keeps its thread until it finishes; an OCR child process is killed when its
    /// future is dropped.
    pub async fn extract(&self, upload: &UploadedFile) -> Result<String, ExtractionError> {
        let mime_type = upload.mime_type();
        let work = async {
            if mime_type == "application/pdf" {
                let bytes = upload.read_bytes().await?;
                self.pdf.extract_text(bytes).await
            } else if mime_type.starts_with("image/") {
                self.ocr
                    .recognize(upload.storage_path(), &self.language)
                    .await
            } else {
                Err(ExtractionError::UnsupportedType(mime_type.to_string()))
            }
        };

        let text = tokio::time::timeout(self.timeout, work)
            .await
            .map_err(|_| ExtractionError::TimedOut(self.timeout))??;

        if text.trim().is_empty() {
            tracing::warn!(filename = upload.filename(), mime_type, "Extraction produced no text");
            return Err(ExtractionError::NoText);
        }

        tracing::info!(
            filename = upload.filename(),
            mime_type,
            characters = text.chars().count(),
            "Text extracted"
        );
        Ok(text)
    }
}
