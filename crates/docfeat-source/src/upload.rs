//! In-memory batch of uploaded PDFs

use crate::error::SourceError;
use crate::render::Renderer;
use docfeat_domain::{Document, DocumentSource};

/// Uploaded byte blobs, processed in upload order
#[derive(Debug, Clone)]
pub struct UploadSource {
    uploads: Vec<(String, Vec<u8>)>,
    renderer: Renderer,
}

impl UploadSource {
    /// Create an empty upload batch
    pub fn new(renderer: Renderer) -> Self {
        Self {
            uploads: Vec::new(),
            renderer,
        }
    }

    /// Add an upload; filenames must be unique within the batch
    pub fn add(&mut self, name: impl Into<String>, bytes: Vec<u8>) -> Result<(), SourceError> {
        let name = name.into();
        if self.uploads.iter().any(|(existing, _)| *existing == name) {
            return Err(SourceError::DuplicateName(name));
        }
        self.uploads.push((name, bytes));
        Ok(())
    }

    /// Number of uploads
    pub fn len(&self) -> usize {
        self.uploads.len()
    }

    /// Whether the batch is empty
    pub fn is_empty(&self) -> bool {
        self.uploads.is_empty()
    }
}

impl DocumentSource for UploadSource {
    type Error = SourceError;

    fn document_names(&self) -> Vec<String> {
        self.uploads.iter().map(|(name, _)| name.clone()).collect()
    }

    fn render(&self, name: &str) -> Result<Document, Self::Error> {
        let (_, bytes) = self
            .uploads
            .iter()
            .find(|(existing, _)| existing == name)
            .ok_or_else(|| SourceError::UnknownDocument(name.to_string()))?;
        self.renderer.render(name, bytes)
    }
}
