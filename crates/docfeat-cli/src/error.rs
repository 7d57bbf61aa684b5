//! Error types for the CLI application.

use docfeat_extractor::ExtractorError;
use docfeat_llm::LlmError;
use docfeat_source::SourceError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Provider setup error
    #[error("Provider error: {0}")]
    Llm(#[from] LlmError),

    /// Document source error
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    /// Pipeline error
    #[error("{0}")]
    Extractor(#[from] ExtractorError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization error
    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// The input directory held no PDF files
    #[error("No documents found in {}", .0.display())]
    NoDocuments(PathBuf),

    /// Every document was skipped
    #[error("No document produced a row ({0} skipped)")]
    NoRows(usize),
}
