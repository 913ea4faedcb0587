//! Result assembly: merge upload metadata, extracted text, and summaries.

use crate::intake::UploadedFile;
use crate::processing::types::{ProcessedDocument, SummaryOutput};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Current timestamp formatted for responses and storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Build the response document for `upload`. The identifier is filled in after persistence.
pub fn assemble_document(
    upload: &UploadedFile,
    extracted_text: String,
    output: SummaryOutput,
) -> ProcessedDocument {
    ProcessedDocument {
        id: None,
        filename: upload.filename().to_string(),
        original_name: upload.original_name().to_string(),
        mime_type: upload.mime_type().to_string(),
        extracted_text,
        summaries: output.summaries,
        key_points: output.key_points,
        created_at: current_timestamp_rfc3339(),
    }
}
