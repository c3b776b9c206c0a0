// ABOUTME: Error types for the html2pptx application
// ABOUTME: Separates fatal pipeline errors from contained per-document render failures

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Input directory not found: {0:?}")]
    InputNotFound(PathBuf),

    #[error("Path is not a directory: {0:?}")]
    NotADirectory(PathBuf),

    #[error("No .{extension} documents found in {dir:?}")]
    NoDocumentsFound { dir: PathBuf, extension: String },

    #[error("Headless browser error: {message}")]
    BrowserError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Failed to write deck to {path:?}: {message}")]
    PersistFailure { path: PathBuf, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConvertError {
    /// Short label for the pipeline stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            ConvertError::InputNotFound(_)
            | ConvertError::NotADirectory(_)
            | ConvertError::NoDocumentsFound { .. } => "input",
            ConvertError::BrowserError { .. } => "render",
            ConvertError::PersistFailure { .. } => "persist",
            ConvertError::ConfigError(_) => "config",
            ConvertError::Io(_) => "io",
        }
    }
}

pub type Result<T> = std::result::Result<T, ConvertError>;

/// A failure confined to a single document.
///
/// Stored inside [`crate::render::RenderResult`]; it never aborts the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("rendering engine failed: {0}")]
    Engine(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("timed out after {timeout_ms}ms while {stage}")]
    Timeout { stage: &'static str, timeout_ms: u64 },

    #[error("screenshot failed: {0}")]
    Capture(String),

    #[error("text extraction failed: {0}")]
    TextExtraction(String),
}
