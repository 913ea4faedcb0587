//! HTTP surface for the document summarizer.
//!
//! This module exposes a compact Axum router with three endpoints:
//!
//! - `POST /api/upload` – Accept one multipart file under the `document` field (PDF, JPEG, or
//!   PNG, at most 10 MiB), extract its text, summarize it at three lengths, and return the
//!   processed document. Validation failures and empty documents answer `400`; extraction,
//!   generation, and configuration failures answer `500`. Error bodies are `{ "error": message }`.
//! - `GET /api/health` – Liveness plus collaborator readiness (`database`, `gemini`).
//! - `GET /api/metrics` – Pipeline counters since start.
//!
//! Any origin may call the API; requests are traced through `tower-http`. Every response carries
//! `X-Content-Type-Options`, `X-Frame-Options`, and `Referrer-Policy` headers.

use crate::intake::{IntakeError, MAX_UPLOAD_BYTES, UPLOAD_FIELD, UploadedFile};
use crate::metrics::MetricsSnapshot;
use crate::processing::{
    DocumentApi, PipelineError, ProcessedDocument, current_timestamp_rfc3339,
};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use futures_util::StreamExt;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};

/// Transport body limit: the upload ceiling plus room for multipart framing.
const UPLOAD_BODY_LIMIT: usize = MAX_UPLOAD_BYTES as usize + 1024 * 1024;

/// Build the HTTP router exposing the document API surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: DocumentApi + 'static,
{
    Router::new()
        .route("/api/upload", post(upload_document::<S>))
        .route("/api/health", get(health::<S>))
        .route("/api/metrics", get(metrics::<S>))
        .layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("SAMEORIGIN"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::REFERRER_POLICY,
            HeaderValue::from_static("no-referrer"),
        ))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Stage the uploaded file and run it through the pipeline.
async fn upload_document<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ProcessedDocument>, AppError>
where
    S: DocumentApi,
{
    let upload = match receive_upload(service.as_ref(), multipart).await {
        Ok(upload) => upload,
        Err(error) => {
            let error = PipelineError::from(error);
            service.record_rejection(&error);
            return Err(AppError(error));
        }
    };

    let document = service.process_upload(upload).await?;
    Ok(Json(document))
}

/// Pull exactly one `document` field out of the request and stage it.
///
/// Other fields are skipped. A second `document` field rejects the request and the first
/// staged file is removed when its handle drops.
async fn receive_upload<S>(
    service: &S,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<UploadedFile, IntakeError>
where
    S: DocumentApi,
{
    let mut multipart = multipart.map_err(|rejection| {
        tracing::debug!(reason = %rejection.body_text(), "Request is not a multipart upload");
        IntakeError::MissingFile
    })?;

    let mut staged: Option<UploadedFile> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(classify_multipart_error)?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        if staged.is_some() {
            return Err(IntakeError::MultipleFiles);
        }
        let original_name = field.file_name().unwrap_or(UPLOAD_FIELD).to_string();
        let mime_type = field.content_type().map(str::to_string);
        let upload = service
            .scratch()
            .stage(
                &original_name,
                mime_type.as_deref(),
                field.map(|chunk| chunk.map_err(classify_multipart_error)),
            )
            .await?;
        staged = Some(upload);
    }

    staged.ok_or(IntakeError::MissingFile)
}

/// A body cut off by the transport limit is an oversized upload, not a malformed one.
fn classify_multipart_error(error: MultipartError) -> IntakeError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        tracing::warn!(limit = UPLOAD_BODY_LIMIT, "Upload body exceeded transport limit");
        IntakeError::TooLarge {
            limit: MAX_UPLOAD_BYTES,
        }
    } else {
        IntakeError::Malformed(error.body_text())
    }
}

/// Response body for `GET /api/health`.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    timestamp: String,
    database: &'static str,
    gemini: &'static str,
}

async fn health<S>(State(service): State<Arc<S>>) -> Json<HealthResponse>
where
    S: DocumentApi,
{
    let snapshot = service.health();
    Json(HealthResponse {
        status: "ok",
        timestamp: current_timestamp_rfc3339(),
        database: if snapshot.database_connected {
            "connected"
        } else {
            "disconnected"
        },
        gemini: if snapshot.gemini_configured {
            "configured"
        } else {
            "not configured"
        },
    })
}

/// Return pipeline counters.
async fn metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: DocumentApi,
{
    Json(service.metrics_snapshot())
}

struct AppError(PipelineError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.0.status_code();
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(inner: PipelineError) -> Self {
        Self(inner)
    }
}
