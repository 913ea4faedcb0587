use super::ExtractionError;
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;

/// Recognizes text in an image file.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Run recognition on `image` using the given Tesseract language code.
    async fn recognize(&self, image: &Path, language: &str) -> Result<String, ExtractionError>;
}

/// OCR backend that shells out to the `tesseract` executable.
#[derive(Debug, Clone)]
pub struct TesseractOcr {
    binary: String,
}

impl TesseractOcr {
    /// Use the given executable name or path.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrBackend for TesseractOcr {
    async fn recognize(&self, image: &Path, language: &str) -> Result<String, ExtractionError> {
        tracing::debug!(
            binary = %self.binary,
            image = %image.display(),
            language,
            "Running OCR"
        );
        let output = Command::new(&self.binary)
            .arg(image)
            .arg("stdout")
            .args(["-l", language])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| {
                ExtractionError::Ocr(format!("failed to launch {}: {error}", self.binary))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Ocr(format!(
                "{} exited with {}: {}",
                self.binary,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
