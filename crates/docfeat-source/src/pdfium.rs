//! Page rasterization with pdfium

use crate::error::SourceError;
use docfeat_domain::Attachment;
use pdfium_render::prelude::*;
use std::fmt;
use std::io::Cursor;

/// A bound pdfium library, reused for every document
pub(crate) struct PageRasterizer {
    pdfium: Pdfium,
}

impl fmt::Debug for PageRasterizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PageRasterizer").finish_non_exhaustive()
    }
}

impl PageRasterizer {
    /// Bind pdfium from the working directory, else the system library
    pub(crate) fn new() -> Result<Self, SourceError> {
        let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| SourceError::Unsupported(format!("Failed to bind pdfium library: {}", e)))?;
        tracing::debug!("Bound pdfium library");

        Ok(Self {
            pdfium: Pdfium::new(bindings),
        })
    }

    /// Render every page of a PDF to PNG, in page order
    pub(crate) fn render_pages(
        &self,
        name: &str,
        bytes: &[u8],
        dpi: f32,
    ) -> Result<Vec<Attachment>, SourceError> {
        let rendering_error = |reason: String| SourceError::Rendering {
            name: name.to_string(),
            reason,
        };

        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, None)
            .map_err(|e| rendering_error(e.to_string()))?;

        // PDF points are 72 per inch
        let scale = dpi / 72.0;
        let page_count = document.pages().len();
        let mut pages = Vec::with_capacity(page_count as usize);

        for (page_idx, page) in document.pages().iter().enumerate() {
            let config = PdfRenderConfig::new()
                .set_target_width((page.width().value * scale) as i32)
                .set_target_height((page.height().value * scale) as i32)
                .render_form_data(true)
                .render_annotations(true);

            let bitmap = page
                .render_with_config(&config)
                .map_err(|e| rendering_error(format!("page {}: {}", page_idx + 1, e)))?;

            let mut png = Vec::new();
            bitmap
                .as_image()
                .write_to(&mut Cursor::new(&mut png), image::ImageFormat::Png)
                .map_err(|e| rendering_error(format!("page {}: {}", page_idx + 1, e)))?;

            tracing::trace!("Rendered page {}/{} of {}", page_idx + 1, page_count, name);
            pages.push(Attachment::png(png));
        }

        Ok(pages)
    }
}
