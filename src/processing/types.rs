//! Core data types and error definitions for the document pipeline.

use crate::extraction::ExtractionError;
use crate::intake::IntakeError;
use crate::summarization::GenerationError;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Three independently generated summaries of the same extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarySet {
    /// Two to three sentences.
    pub short: String,
    /// One paragraph of four to six sentences.
    pub medium: String,
    /// Two to three paragraphs.
    pub long: String,
}

/// Orchestrator output: the summary set plus parsed key points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOutput {
    /// Summaries at the three lengths.
    pub summaries: SummarySet,
    /// Ordered key points parsed from the bulleted response.
    pub key_points: Vec<String>,
}

/// Result returned to the client and optionally persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedDocument {
    /// Storage identifier, present only when persistence succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Generated scratch file name.
    pub filename: String,
    /// Name supplied by the client.
    pub original_name: String,
    /// Normalized MIME type of the upload.
    pub mime_type: String,
    /// Full extracted text (never truncated).
    pub extracted_text: String,
    /// Summaries at the three lengths.
    pub summaries: SummarySet,
    /// Ordered key points.
    pub key_points: Vec<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Liveness and configuration snapshot for the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthSnapshot {
    /// Whether the persistence collaborator reports itself available.
    pub database_connected: bool,
    /// Whether a generation credential is configured.
    pub gemini_configured: bool,
}

/// Errors emitted by the document pipeline.
///
/// Every failure collapses to one of these at the orchestration boundary; there is never a
/// partial result alongside an error.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The upload was rejected by intake.
    #[error(transparent)]
    Validation(IntakeError),
    /// Extraction produced no usable text.
    #[error("No text found")]
    EmptyContent,
    /// The extraction backend failed.
    #[error(transparent)]
    Extraction(ExtractionError),
    /// A generation call failed.
    #[error(transparent)]
    Generation(#[from] GenerationError),
    /// Required configuration is missing.
    #[error("{0}")]
    Configuration(String),
    /// Unexpected local I/O failure.
    #[error("Unexpected I/O failure: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Whether the failure is attributable to the request rather than the server.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::EmptyContent)
    }

    /// HTTP status reported for this failure.
    pub fn status_code(&self) -> StatusCode {
        if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<IntakeError> for PipelineError {
    fn from(error: IntakeError) -> Self {
        match error {
            IntakeError::Io(inner) => Self::Io(inner),
            other => Self::Validation(other),
        }
    }
}

impl From<ExtractionError> for PipelineError {
    fn from(error: ExtractionError) -> Self {
        match error {
            ExtractionError::NoText => Self::EmptyContent,
            other => Self::Extraction(other),
        }
    }
}
