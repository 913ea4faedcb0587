#![deny(missing_docs)]

//! Core library for the docscan document summarizer.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// PDF and OCR text extraction.
pub mod extraction;
/// Upload validation and scratch staging.
pub mod intake;
/// Structured logging and tracing setup.
pub mod logging;
/// Pipeline metrics helpers.
pub mod metrics;
/// Summarization orchestration and the document pipeline.
pub mod processing;
/// Optional persistence of processed documents.
pub mod storage;
/// Text generation client abstraction and the Gemini adapter.
pub mod summarization;
