//! Model-assisted reading: page transcription and document summaries

use crate::error::ExtractorError;
use crate::prompt::{transcription_prompt, PromptBuilder};
use crate::types::{complete, DocumentInput};
use docfeat_domain::{Attachment, CompletionClient};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, warn};

/// Turns image or PDF attachments into text and summarizes documents
pub struct DocumentReader<C> {
    client: Arc<C>,
    system_prompt: String,
    max_text_chars: usize,
}

impl<C> DocumentReader<C>
where
    C: CompletionClient,
    C::Error: Display,
{
    /// Create a reader sharing the given client
    pub fn new(client: Arc<C>, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            system_prompt: system_prompt.into(),
            max_text_chars: 0,
        }
    }

    /// Truncate text sent for summarization (0 = unlimited)
    pub fn with_max_text_chars(mut self, max_text_chars: usize) -> Self {
        self.max_text_chars = max_text_chars;
        self
    }

    /// Ask the model to transcribe the attached pages
    ///
    /// An empty transcription is returned as-is; later stages then see no text.
    pub fn transcribe(&self, name: &str, attachments: &[Attachment]) -> Result<String, ExtractorError> {
        info!("Transcribing {} ({} attachment(s))", name, attachments.len());

        let reply = complete(
            self.client.as_ref(),
            &self.system_prompt,
            transcription_prompt(),
            attachments,
        )?;

        let text = reply.trim().to_string();
        if text.is_empty() {
            warn!("Transcription of {} came back empty", name);
        }
        Ok(text)
    }

    /// Ask the model for a short summary of the document's type and purpose
    pub fn summarize(&self, input: &DocumentInput<'_>) -> Result<String, ExtractorError> {
        let prompt = PromptBuilder::new(input.text)
            .with_max_chars(self.max_text_chars)
            .summary();

        let reply = complete(
            self.client.as_ref(),
            &self.system_prompt,
            prompt,
            input.attachments,
        )?;
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfeat_llm::MockProvider;

    #[test]
    fn test_transcribe_sends_attachments() {
        let mut provider = MockProvider::default();
        provider.add_response("Transcribe", "  Revenue: $5M  ");
        let reader = DocumentReader::new(Arc::new(provider.clone()), "system");

        let pages = vec![Attachment::png(vec![1, 2, 3]), Attachment::png(vec![4, 5])];
        let text = reader.transcribe("A.pdf", &pages).unwrap();

        assert_eq!(text, "Revenue: $5M");
        let requests = provider.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].attachments.len(), 2);
        assert_eq!(requests[0].system_prompt.as_deref(), Some("system"));
    }

    #[test]
    fn test_transcribe_propagates_failure() {
        let mut provider = MockProvider::default();
        provider.add_error("Transcribe");
        let reader = DocumentReader::new(Arc::new(provider), "system");

        let result = reader.transcribe("A.pdf", &[Attachment::png(vec![0])]);
        assert!(matches!(result, Err(ExtractorError::Llm(_))));
    }

    #[test]
    fn test_summarize_uses_text() {
        let mut provider = MockProvider::default();
        provider.add_response("Summarize", "A quarterly financial report.");
        let reader = DocumentReader::new(Arc::new(provider.clone()), "");

        let input = DocumentInput::text("A.pdf", "Revenue was $5M");
        let summary = reader.summarize(&input).unwrap();

        assert_eq!(summary, "A quarterly financial report.");
        let requests = provider.requests();
        assert!(requests[0].user_prompt.contains("Revenue was $5M"));
        assert!(requests[0].system_prompt.is_none());
    }
}
