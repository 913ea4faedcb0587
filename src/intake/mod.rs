//! File intake: type gate, size ceiling, and request-scoped scratch staging.

mod scratch;

pub use scratch::{ScratchStore, UploadedFile};

#[cfg(test)]
pub(crate) use scratch::stage_bytes;

use thiserror::Error;

/// Multipart field carrying the uploaded document.
pub const UPLOAD_FIELD: &str = "document";

/// Largest accepted upload in bytes (10 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// MIME types accepted by intake.
pub const ACCEPTED_MIME_TYPES: [&str; 4] =
    ["application/pdf", "image/jpeg", "image/jpg", "image/png"];

/// Errors raised while receiving and staging an upload.
#[derive(Debug, Error)]
pub enum IntakeError {
    /// The request carried no `document` field.
    #[error("No file uploaded")]
    MissingFile,
    /// The declared MIME type is not one of [`ACCEPTED_MIME_TYPES`].
    #[error("Invalid file type")]
    InvalidType {
        /// MIME type declared by the client, if any.
        mime_type: Option<String>,
    },
    /// The upload exceeded the size ceiling while streaming.
    #[error("File too large")]
    TooLarge {
        /// Ceiling that was exceeded, in bytes.
        limit: u64,
    },
    /// More than one `document` field was supplied.
    #[error("Only one file may be uploaded per request")]
    MultipleFiles,
    /// The multipart body could not be decoded.
    #[error("Malformed upload: {0}")]
    Malformed(String),
    /// Scratch storage could not be written.
    #[error("Failed to stage upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Normalize a declared MIME type: lower-case essence with parameters removed.
pub fn normalize_mime(mime_type: &str) -> String {
    mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Return the normalized MIME type when intake accepts it.
pub fn accepted_mime(mime_type: &str) -> Option<String> {
    let normalized = normalize_mime(mime_type);
    ACCEPTED_MIME_TYPES
        .contains(&normalized.as_str())
        .then_some(normalized)
}

/// Canonical file extension (with leading dot) for an accepted MIME type.
pub(crate) fn default_extension(mime_type: &str) -> &'static str {
    match mime_type {
        "application/pdf" => ".pdf",
        "image/png" => ".png",
        "image/jpeg" | "image/jpg" => ".jpg",
        _ => "",
    }
}
