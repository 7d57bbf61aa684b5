//! Error types for document sources

use thiserror::Error;

/// Errors raised while enumerating or rendering documents
#[derive(Error, Debug)]
pub enum SourceError {
    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The bytes do not start with a PDF header
    #[error("Not a PDF document: {0}")]
    NotAPdf(String),

    /// Text rendering produced nothing (scanned or image-only PDF)
    #[error("No extractable text in {0}")]
    EmptyText(String),

    /// The renderer failed on a corrupt or encrypted document
    #[error("Failed to render {name}: {reason}")]
    Rendering {
        /// Document name
        name: String,
        /// Backend failure message
        reason: String,
    },

    /// Render mode not available in this build
    #[error("Unsupported render mode: {0}")]
    Unsupported(String),

    /// The source has no document with this name
    #[error("Unknown document: {0}")]
    UnknownDocument(String),

    /// Two uploads share one filename
    #[error("Duplicate document name: {0}")]
    DuplicateName(String),
}
