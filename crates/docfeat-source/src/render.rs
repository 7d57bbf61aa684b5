//! Rendering PDF bytes into model-consumable content

use crate::error::SourceError;
use docfeat_domain::{Attachment, Document, DocumentContent};
use serde::{Deserialize, Serialize};
use std::panic;
#[cfg(feature = "pdfium")]
use std::{cell::OnceCell, rc::Rc};
use tracing::debug;

/// Default resolution for page rasterization
pub const DEFAULT_DPI: f32 = 300.0;

const PDF_MAGIC: &[u8] = b"%PDF-";

/// How documents are handed to the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Extract plain text locally
    #[default]
    Text,
    /// Rasterize each page to PNG
    PageImages,
    /// Forward the original PDF bytes
    RawPdf,
}

/// Renders PDF bytes according to a [`RenderMode`]
///
/// With the `pdfium` feature, the pdfium library is bound on the first
/// page-image render and shared by clones of the renderer.
#[derive(Debug, Clone)]
pub struct Renderer {
    mode: RenderMode,
    #[cfg_attr(not(feature = "pdfium"), allow(dead_code))]
    dpi: f32,
    #[cfg(feature = "pdfium")]
    rasterizer: Rc<OnceCell<crate::pdfium::PageRasterizer>>,
}

impl Renderer {
    /// Create a renderer for the given mode
    pub fn new(mode: RenderMode) -> Self {
        Self {
            mode,
            dpi: DEFAULT_DPI,
            #[cfg(feature = "pdfium")]
            rasterizer: Rc::new(OnceCell::new()),
        }
    }

    /// Set the rasterization resolution (page images only)
    pub fn with_dpi(mut self, dpi: f32) -> Self {
        self.dpi = dpi;
        self
    }

    /// The configured mode
    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    /// Render one document
    ///
    /// # Errors
    ///
    /// Returns error if the bytes are not a PDF, the backend rejects them,
    /// or text mode finds no text.
    pub fn render(&self, name: &str, bytes: &[u8]) -> Result<Document, SourceError> {
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(SourceError::NotAPdf(name.to_string()));
        }

        let content = match self.mode {
            RenderMode::Text => DocumentContent::Text(extract_text(name, bytes)?),
            RenderMode::RawPdf => DocumentContent::RawPdf(Attachment::pdf(name, bytes.to_vec())),
            RenderMode::PageImages => DocumentContent::PageImages(self.render_pages(name, bytes)?),
        };

        debug!(document = name, mode = ?self.mode, "Rendered document");
        Ok(Document::new(name, content))
    }

    #[cfg(feature = "pdfium")]
    fn render_pages(&self, name: &str, bytes: &[u8]) -> Result<Vec<Attachment>, SourceError> {
        if self.rasterizer.get().is_none() {
            let _ = self.rasterizer.set(crate::pdfium::PageRasterizer::new()?);
        }
        match self.rasterizer.get() {
            Some(rasterizer) => rasterizer.render_pages(name, bytes, self.dpi),
            None => Err(SourceError::Unsupported("pdfium library is not bound".to_string())),
        }
    }

    #[cfg(not(feature = "pdfium"))]
    fn render_pages(&self, _name: &str, _bytes: &[u8]) -> Result<Vec<Attachment>, SourceError> {
        Err(SourceError::Unsupported(
            "page images require the `pdfium` feature".to_string(),
        ))
    }
}

fn extract_text(name: &str, bytes: &[u8]) -> Result<String, SourceError> {
    // pdf-extract panics on some malformed inputs.
    let extracted = panic::catch_unwind(|| pdf_extract::extract_text_from_mem(bytes))
        .map_err(|_| SourceError::Rendering {
            name: name.to_string(),
            reason: "text extractor panicked".to_string(),
        })?
        .map_err(|e| SourceError::Rendering {
            name: name.to_string(),
            reason: e.to_string(),
        })?;

    // Pages come back separated by form feeds
    let text = extracted
        .split('\x0C')
        .map(str::trim)
        .filter(|page| !page.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n");

    if text.is_empty() {
        return Err(SourceError::EmptyText(name.to_string()));
    }
    Ok(text)
}
