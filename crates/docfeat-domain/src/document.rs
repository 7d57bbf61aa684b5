//! Document module - rendered input documents

use std::fmt;

/// Binary content sent alongside a prompt (page image or raw PDF)
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    /// MIME type, e.g. "image/png" or "application/pdf"
    pub media_type: String,

    /// Raw bytes
    pub data: Vec<u8>,

    /// Optional filename hint for providers that accept file parts
    pub filename: Option<String>,
}

impl Attachment {
    /// Create a PNG page image attachment
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            media_type: "image/png".to_string(),
            data,
            filename: None,
        }
    }

    /// Create a raw PDF attachment
    pub fn pdf(filename: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            media_type: "application/pdf".to_string(),
            data,
            filename: Some(filename.into()),
        }
    }

    /// Whether this attachment is an image
    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

// Attachments can be megabytes; never dump the payload into logs.
impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("media_type", &self.media_type)
            .field("bytes", &self.data.len())
            .field("filename", &self.filename)
            .finish()
    }
}

/// Model-consumable form of a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentContent {
    /// Extracted plain text
    Text(String),

    /// Rasterized pages, one attachment per page in page order
    PageImages(Vec<Attachment>),

    /// The original PDF bytes, forwarded as a single file attachment
    RawPdf(Attachment),
}

impl DocumentContent {
    /// The plain text, if this content was rendered as text
    pub fn text(&self) -> Option<&str> {
        match self {
            DocumentContent::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Attachments carried by this content, ordered page-wise
    pub fn attachments(&self) -> Vec<Attachment> {
        match self {
            DocumentContent::Text(_) => Vec::new(),
            DocumentContent::PageImages(pages) => pages.clone(),
            DocumentContent::RawPdf(pdf) => vec![pdf.clone()],
        }
    }
}

/// A rendered input document
///
/// Identity is the filename, which is unique across a batch.
/// Documents are immutable once rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    name: String,
    content: DocumentContent,
}

impl Document {
    /// Create a new document
    pub fn new(name: impl Into<String>, content: DocumentContent) -> Self {
        Self {
            name: name.into(),
            content,
        }
    }

    /// Create a text-rendered document
    ///
    /// # Examples
    ///
    /// ```
    /// use docfeat_domain::Document;
    ///
    /// let doc = Document::from_text("A.pdf", "Revenue was $5M");
    /// assert_eq!(doc.name(), "A.pdf");
    /// assert_eq!(doc.content().text(), Some("Revenue was $5M"));
    /// ```
    pub fn from_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, DocumentContent::Text(text.into()))
    }

    /// The document's filename
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The rendered content
    pub fn content(&self) -> &DocumentContent {
        &self.content
    }
}
