//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::document::{Attachment, Document};

/// A single completion request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Optional system prompt
    pub system_prompt: Option<String>,

    /// User prompt text
    pub user_prompt: String,

    /// Binary attachments, ordered page-wise when present
    pub attachments: Vec<Attachment>,
}

impl CompletionRequest {
    /// Create a text-only request
    pub fn new(user_prompt: impl Into<String>) -> Self {
        Self {
            system_prompt: None,
            user_prompt: user_prompt.into(),
            attachments: Vec::new(),
        }
    }

    /// Set the system prompt
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }

    /// Attach binary content
    pub fn with_attachments(mut self, attachments: Vec<Attachment>) -> Self {
        self.attachments = attachments;
        self
    }
}

/// Trait for text-completion model services
///
/// Implemented by the infrastructure layer (docfeat-llm).
/// Calls block until the service answers or fails.
pub trait CompletionClient {
    /// Error type for completion operations
    type Error;

    /// Complete a prompt, returning the model's raw text
    fn complete(&self, request: &CompletionRequest) -> Result<String, Self::Error>;
}

/// Trait for enumerating and rendering input documents
///
/// Implemented by the infrastructure layer (docfeat-source)
pub trait DocumentSource {
    /// Error type for rendering operations
    type Error;

    /// Document names in processing order
    fn document_names(&self) -> Vec<String>;

    /// Render one document into model-consumable form
    fn render(&self, name: &str) -> Result<Document, Self::Error>;
}
