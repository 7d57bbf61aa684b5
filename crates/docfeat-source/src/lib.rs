//! Docfeat Document Sources
//!
//! Enumerates input PDFs and renders each into model-consumable form.
//!
//! # Sources
//!
//! - `DirectorySource`: every `*.pdf` in a directory, sorted by filename
//! - `UploadSource`: an in-memory batch of uploaded byte blobs
//!
//! # Render modes
//!
//! - `Text`: plain text via `pdf-extract`
//! - `RawPdf`: the original bytes as a single file attachment
//! - `PageImages`: one PNG per page via pdfium (requires the `pdfium` feature)

#![warn(missing_docs)]

mod directory;
mod error;
#[cfg(feature = "pdfium")]
mod pdfium;
mod render;
mod upload;

pub use directory::DirectorySource;
pub use error::SourceError;
pub use render::{RenderMode, Renderer, DEFAULT_DPI};
pub use upload::UploadSource;
