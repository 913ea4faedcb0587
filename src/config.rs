use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_SERVER_PORT: u16 = 5000;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_OCR_LANGUAGE: &str = "eng";
const DEFAULT_TESSERACT_PATH: &str = "tesseract";
const DEFAULT_EXTRACTION_TIMEOUT_SECS: u64 = 120;
const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 60;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the document summarizer.
///
/// Built once at process start and shared behind an `Arc`; nothing reads the process
/// environment after this point.
#[derive(Debug, Clone)]
pub struct Config {
    /// Credential for the Gemini generation API. Uploads fail when absent.
    pub gemini_api_key: Option<String>,
    /// Gemini model identifier used for every prompt.
    pub gemini_model: String,
    /// Base URL of the Gemini REST API.
    pub gemini_api_base: String,
    /// Optional SQLite database path enabling best-effort persistence.
    pub database_path: Option<String>,
    /// HTTP listen port.
    pub server_port: u16,
    /// Scratch directory receiving uploaded files while they are processed.
    pub upload_dir: PathBuf,
    /// Tesseract language code passed to the OCR backend.
    pub ocr_language: String,
    /// Path or name of the `tesseract` executable.
    pub tesseract_path: String,
    /// Upper bound on a single text extraction.
    pub extraction_timeout: Duration,
    /// Upper bound on a single generation call.
    pub generation_timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Blank values are treated as unset so that `KEY=` in a `.env` file falls back to the
    /// default instead of producing an empty credential or path.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let load = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Ok(Self {
            gemini_api_key: load("GEMINI_API_KEY").map(|value| value.trim().to_string()),
            gemini_model: load("GEMINI_MODEL").unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            gemini_api_base: load("GEMINI_API_BASE")
                .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.into()),
            database_path: load("DATABASE_PATH"),
            server_port: load("PORT")
                .map(|value| parse_value("PORT", &value))
                .transpose()?
                .unwrap_or(DEFAULT_SERVER_PORT),
            upload_dir: load("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            ocr_language: load("OCR_LANGUAGE").unwrap_or_else(|| DEFAULT_OCR_LANGUAGE.into()),
            tesseract_path: load("TESSERACT_PATH")
                .unwrap_or_else(|| DEFAULT_TESSERACT_PATH.into()),
            extraction_timeout: load_timeout(
                load("EXTRACTION_TIMEOUT_SECS"),
                "EXTRACTION_TIMEOUT_SECS",
                DEFAULT_EXTRACTION_TIMEOUT_SECS,
            )?,
            generation_timeout: load_timeout(
                load("GENERATION_TIMEOUT_SECS"),
                "GENERATION_TIMEOUT_SECS",
                DEFAULT_GENERATION_TIMEOUT_SECS,
            )?,
        })
    }

    /// Whether a generation credential is available.
    pub fn gemini_configured(&self) -> bool {
        self.gemini_api_key.is_some()
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn load_timeout(value: Option<String>, key: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    let secs = match value {
        Some(raw) => parse_value::<u64>(key, &raw)?,
        None => default_secs,
    };
    if secs == 0 {
        return Err(ConfigError::InvalidValue(key.to_string()));
    }
    Ok(Duration::from_secs(secs))
}

/// Load configuration from `.env` and the process environment.
pub fn init_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        gemini_model = %config.gemini_model,
        gemini_configured = config.gemini_configured(),
        database = ?config.database_path,
        server_port = config.server_port,
        upload_dir = %config.upload_dir.display(),
        "Loaded configuration"
    );
    Ok(config)
}
