//! Error types for the Extractor

use thiserror::Error;

/// Errors that can occur during extraction
///
/// Malformed model output is never an error; it resolves to empty lists
/// or "N/A" values instead.
#[derive(Error, Debug)]
pub enum ExtractorError {
    /// Completion service call failed
    #[error("LLM error: {0}")]
    Llm(String),

    /// Document could not be rendered
    #[error("Rendering error: {0}")]
    Rendering(String),

    /// CSV serialization error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// A document failed and aborted the batch
    #[error("Document {index} ({name}) failed: {source}")]
    DocumentFailed {
        /// 1-based position in the batch
        index: usize,
        /// Document filename
        name: String,
        /// Underlying failure
        source: Box<ExtractorError>,
    },
}
