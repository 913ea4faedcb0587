//! Document pipeline: summarization orchestration, result assembly, and the service tying
//! intake, extraction, generation, and persistence together.

mod assemble;
mod service;
pub mod summarize;
pub mod types;

pub use assemble::assemble_document;
pub(crate) use assemble::current_timestamp_rfc3339;
pub use service::{DocumentApi, DocumentService};
pub use summarize::{PromptKind, SummaryOrchestrator};
pub use types::{
    HealthSnapshot, PipelineError, ProcessedDocument, SummaryOutput, SummarySet,
};
