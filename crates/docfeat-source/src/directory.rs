//! Directory-backed document source

use crate::error::SourceError;
use crate::render::Renderer;
use docfeat_domain::{Document, DocumentSource};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

/// Every `*.pdf` file directly inside a directory, sorted by filename
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
    files: Vec<String>,
    renderer: Renderer,
}

impl DirectorySource {
    /// List PDFs under `root`
    ///
    /// A missing directory is logged and yields an empty source.
    pub fn open(root: impl AsRef<Path>, renderer: Renderer) -> Result<Self, SourceError> {
        let root = root.as_ref().to_path_buf();

        if !root.exists() {
            error!("Source directory {} is missing", root.display());
            return Ok(Self {
                root,
                files: Vec::new(),
                renderer,
            });
        }

        let mut files = Vec::new();
        for entry in fs::read_dir(&root)? {
            let path = entry?.path();
            let is_pdf = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map_or(false, |ext| ext.eq_ignore_ascii_case("pdf"));
            if !is_pdf || !path.is_file() {
                continue;
            }
            match path.file_name().and_then(|n| n.to_str()) {
                Some(name) => files.push(name.to_string()),
                None => warn!("Skipping {}: filename is not valid UTF-8", path.display()),
            }
        }
        files.sort();

        info!("Found {} PDF documents in {}", files.len(), root.display());
        Ok(Self {
            root,
            files,
            renderer,
        })
    }

    /// The directory being read
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DocumentSource for DirectorySource {
    type Error = SourceError;

    fn document_names(&self) -> Vec<String> {
        self.files.clone()
    }

    fn render(&self, name: &str) -> Result<Document, Self::Error> {
        if !self.files.iter().any(|f| f == name) {
            return Err(SourceError::UnknownDocument(name.to_string()));
        }
        let bytes = fs::read(self.root.join(name))?;
        self.renderer.render(name, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RenderMode;
    use docfeat_domain::DocumentContent;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.pdf"), b"%PDF-1.7 b").unwrap();
        fs::write(dir.path().join("a.PDF"), b"%PDF-1.7 a").unwrap();
        fs::write(dir.path().join("c.pdf"), b"%PDF-1.7 c").unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignore me").unwrap();
        fs::create_dir(dir.path().join("nested.pdf")).unwrap();
        dir
    }

    #[test]
    fn test_lists_pdfs_sorted() {
        let dir = fixture();
        let source = DirectorySource::open(dir.path(), Renderer::new(RenderMode::RawPdf)).unwrap();

        assert_eq!(source.document_names(), vec!["a.PDF", "b.pdf", "c.pdf"]);
        assert_eq!(source.root(), dir.path());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("does-not-exist");
        let source = DirectorySource::open(&missing, Renderer::new(RenderMode::Text)).unwrap();

        assert!(source.document_names().is_empty());
    }

    #[test]
    fn test_render_reads_file() {
        let dir = fixture();
        let source = DirectorySource::open(dir.path(), Renderer::new(RenderMode::RawPdf)).unwrap();

        let document = source.render("b.pdf").unwrap();
        match document.content() {
            DocumentContent::RawPdf(pdf) => assert_eq!(pdf.data, b"%PDF-1.7 b".to_vec()),
            other => panic!("Expected raw PDF, got {:?}", other),
        }
    }

    #[test]
    fn test_render_unknown_document() {
        let dir = fixture();
        let source = DirectorySource::open(dir.path(), Renderer::new(RenderMode::RawPdf)).unwrap();

        let result = source.render("notes.txt");
        assert!(matches!(result, Err(SourceError::UnknownDocument(_))));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_filename_is_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = fixture();
        let odd = OsStr::from_bytes(b"report-\xff.pdf");
        fs::write(dir.path().join(odd), b"%PDF-1.7 odd").unwrap();

        let source = DirectorySource::open(dir.path(), Renderer::new(RenderMode::RawPdf)).unwrap();
        assert_eq!(source.document_names(), vec!["a.PDF", "b.pdf", "c.pdf"]);
    }
}
