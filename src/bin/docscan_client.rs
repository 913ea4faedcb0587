use std::{
    fmt::Write as _,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};
use docscan::processing::ProcessedDocument;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

#[derive(Parser)]
#[command(
    name = "docscan-client",
    about = "Upload a PDF or image to a docscan server and print its summary"
)]
struct Cli {
    /// Document to upload (PDF, JPEG, or PNG).
    file: PathBuf,
    /// Base URL of the docscan server.
    #[arg(long, default_value = "http://localhost:5000")]
    server: String,
    /// Summary length to print.
    #[arg(long, value_enum, default_value_t = SummaryLength::Medium)]
    length: SummaryLength,
    /// Also print the full extracted text.
    #[arg(long)]
    show_text: bool,
    /// Print the raw JSON response instead of the formatted summary.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum SummaryLength {
    Short,
    Medium,
    Long,
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

enum UploadOutcome {
    Processed {
        document: Box<ProcessedDocument>,
        raw: String,
    },
    Rejected {
        message: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(err) = run(Cli::parse()).await {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let file_name = display_name(&cli.file);
    stage(1, &format!("Uploading {file_name}"));
    let http = reqwest::Client::new();

    match upload(&http, &cli.server, &cli.file).await? {
        UploadOutcome::Rejected { message } => bail!("{message}"),
        UploadOutcome::Processed { document, raw } => {
            stage(
                2,
                &format!(
                    "Extracted {} characters",
                    document.extracted_text.chars().count()
                ),
            );
            stage(
                3,
                &format!("Summarized with {} key points", document.key_points.len()),
            );
            stage(4, "Complete");
            if cli.json {
                println!("{raw}");
            } else {
                print!("{}", render(&document, cli.length, cli.show_text));
            }
            Ok(())
        }
    }
}

fn stage(step: u8, message: &str) {
    eprintln!("[{step}/4] {message}");
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// MIME type for the upload, guessed from the file extension.
///
/// Unknown extensions are sent as `application/octet-stream` and left for the server to reject.
fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("pdf") => "application/pdf",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        _ => "application/octet-stream",
    }
}

async fn upload(http: &reqwest::Client, server: &str, path: &Path) -> Result<UploadOutcome> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let part = Part::bytes(bytes)
        .file_name(display_name(path))
        .mime_str(guess_mime(path))
        .context("invalid MIME type")?;
    let form = Form::new().part("document", part);

    let url = format!("{}/api/upload", server.trim_end_matches('/'));
    let response = http
        .post(&url)
        .multipart(form)
        .send()
        .await
        .with_context(|| format!("failed to reach {url}"))?;

    let status = response.status();
    let raw = response
        .text()
        .await
        .context("failed to read server response")?;

    if !status.is_success() {
        let message = serde_json::from_str::<ErrorBody>(&raw)
            .map(|body| body.error)
            .unwrap_or_else(|_| format!("server returned {status}"));
        return Ok(UploadOutcome::Rejected { message });
    }

    let document: ProcessedDocument =
        serde_json::from_str(&raw).context("server returned an unexpected response")?;
    Ok(UploadOutcome::Processed {
        document: Box::new(document),
        raw,
    })
}

fn render(document: &ProcessedDocument, length: SummaryLength, show_text: bool) -> String {
    let (label, summary) = match length {
        SummaryLength::Short => ("Short", &document.summaries.short),
        SummaryLength::Medium => ("Medium", &document.summaries.medium),
        SummaryLength::Long => ("Long", &document.summaries.long),
    };

    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", document.original_name, document.mime_type);
    if let Some(id) = &document.id {
        let _ = writeln!(out, "Saved as {id}");
    }
    let _ = writeln!(out, "\n{label} summary:\n{summary}");
    if !document.key_points.is_empty() {
        let _ = writeln!(out, "\nKey points:");
        for point in &document.key_points {
            let _ = writeln!(out, "  • {point}");
        }
    }
    if show_text {
        let _ = writeln!(out, "\nExtracted text:\n{}", document.extracted_text);
    }
    out
}
