//! Input types shared by the pipeline stages

use crate::error::ExtractorError;
use docfeat_domain::{Attachment, CompletionClient, CompletionRequest};
use std::fmt::Display;
use tracing::debug;

/// One document as seen by the discovery and extraction stages
#[derive(Debug, Clone, Copy)]
pub struct DocumentInput<'a> {
    /// Document filename
    pub name: &'a str,

    /// Document text (empty when the document is forwarded as attachments)
    pub text: &'a str,

    /// Attachments forwarded with every prompt
    pub attachments: &'a [Attachment],

    /// Optional summary of the document's type and purpose
    pub context: Option<&'a str>,
}

impl<'a> DocumentInput<'a> {
    /// Input carrying plain text only
    pub fn text(name: &'a str, text: &'a str) -> Self {
        Self {
            name,
            text,
            attachments: &[],
            context: None,
        }
    }

    /// Forward attachments with every prompt
    pub fn with_attachments(mut self, attachments: &'a [Attachment]) -> Self {
        self.attachments = attachments;
        self
    }

    /// Attach a document summary
    pub fn with_context(mut self, context: Option<&'a str>) -> Self {
        self.context = context;
        self
    }
}

/// Send one prompt and return the raw reply
pub(crate) fn complete<C>(
    client: &C,
    system_prompt: &str,
    prompt: String,
    attachments: &[Attachment],
) -> Result<String, ExtractorError>
where
    C: CompletionClient,
    C::Error: Display,
{
    debug!(
        "Prompt length: {} chars, {} attachment(s)",
        prompt.len(),
        attachments.len()
    );

    let mut request = CompletionRequest::new(prompt).with_attachments(attachments.to_vec());
    if !system_prompt.trim().is_empty() {
        request = request.with_system_prompt(system_prompt);
    }

    let reply = client
        .complete(&request)
        .map_err(|e| ExtractorError::Llm(e.to_string()))?;

    debug!("LLM response length: {} chars", reply.len());
    Ok(reply)
}
