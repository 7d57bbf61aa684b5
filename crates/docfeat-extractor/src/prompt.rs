//! Prompt construction for feature discovery and extraction

use docfeat_domain::{FeatureName, GlobalSchema};

/// Builds prompts around one document's text
pub struct PromptBuilder<'a> {
    text: &'a str,
    max_chars: usize,
    context: Option<&'a str>,
}

impl<'a> PromptBuilder<'a> {
    /// Create a builder for the given document text
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            max_chars: 0,
            context: None,
        }
    }

    /// Truncate the document text to at most `max_chars` characters (0 = unlimited)
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }

    /// Prepend a document summary to the proposal prompt
    pub fn with_context(mut self, context: Option<&'a str>) -> Self {
        self.context = context.filter(|c| !c.trim().is_empty());
        self
    }

    /// Prompt asking for a short summary of the document's type and purpose
    pub fn summary(&self) -> String {
        let mut prompt = String::from(SUMMARY_INSTRUCTIONS);
        prompt.push_str("\n\n");
        self.push_text(&mut prompt);
        prompt
    }

    /// Prompt asking which features are worth extracting from this document
    pub fn propose(&self) -> String {
        let mut prompt = String::from(PROPOSE_INSTRUCTIONS);
        prompt.push_str("\n\n");

        if let Some(context) = self.context {
            prompt.push_str("Document summary:\n");
            prompt.push_str(context.trim());
            prompt.push_str("\n\n");
        }

        self.push_text(&mut prompt);
        prompt.push_str(LIST_FORMAT_REMINDER);
        prompt
    }

    /// Prompt asking for every schema feature in one JSON object
    pub fn extract(&self, schema: &GlobalSchema) -> String {
        let mut prompt = String::from(EXTRACT_INSTRUCTIONS);
        prompt.push_str("\n\n");
        prompt.push_str(&format!("FEATURES: {}\n\n", schema.to_delimited()));
        self.push_text(&mut prompt);
        prompt.push_str(JSON_FORMAT_REMINDER);
        prompt
    }

    /// Prompt asking for a single feature as a one-key JSON object
    pub fn extract_feature(&self, feature: &FeatureName) -> String {
        let mut prompt = String::from(EXTRACT_FEATURE_INSTRUCTIONS);
        prompt.push_str("\n\n");
        prompt.push_str(&format!("FEATURE: {}\n\n", feature));
        self.push_text(&mut prompt);
        prompt.push_str(JSON_FORMAT_REMINDER);
        prompt
    }

    fn push_text(&self, prompt: &mut String) {
        let text = truncate_chars(self.text.trim(), self.max_chars);
        if text.is_empty() {
            prompt.push_str("The document is attached.\n\n");
            return;
        }
        prompt.push_str("TEXT:\n---\n");
        prompt.push_str(text);
        prompt.push_str("\n---\n\n");
    }
}

/// Prompt asking the model to transcribe attached pages to text
pub fn transcription_prompt() -> String {
    TRANSCRIBE_INSTRUCTIONS.to_string()
}

/// Prompt asking the model to combine two feature lists by meaning
pub fn merge_prompt(existing: &GlobalSchema, proposed: &[FeatureName]) -> String {
    let proposed = proposed
        .iter()
        .map(FeatureName::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    let mut prompt = String::from(MERGE_INSTRUCTIONS);
    prompt.push_str("\n\n");
    prompt.push_str(&format!("LIST 1: {}\n", existing.to_delimited()));
    prompt.push_str(&format!("LIST 2: {}\n\n", proposed));
    prompt.push_str(LIST_FORMAT_REMINDER);
    prompt
}

fn truncate_chars(text: &str, max_chars: usize) -> &str {
    if max_chars == 0 {
        return text;
    }
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

const TRANSCRIBE_INSTRUCTIONS: &str = "Transcribe the attached document. Return its full text content \
and, for each picture, chart or figure it contains, a one-sentence description. \
Leave out image descriptions when there are no images. \
Return only the transcribed text and the descriptions.";

const SUMMARY_INSTRUCTIONS: &str = "Summarize what kind of document this is: its type \
(financial report, contract, research paper, medical record, ...), its purpose, \
and what sort of details it holds. Answer in two or three sentences.";

const PROPOSE_INSTRUCTIONS: &str = "Identify the most important features that could be extracted \
from the document below as table columns. Consider the document's type and purpose. \
Skip features that make no sense for this document and do not add explanations in parentheses.";

const MERGE_INSTRUCTIONS: &str = "Combine the two feature lists below into one list. \
Treat items that mean the same thing (for example \"Revenue\" and \"Total Revenue\") as duplicates \
and keep a single spelling for them.";

const EXTRACT_INSTRUCTIONS: &str = "Extract the value of each listed feature from the document below. \
Use the feature names exactly as given as JSON keys.";

const EXTRACT_FEATURE_INSTRUCTIONS: &str = "Extract the value of the listed feature from the document below. \
Use the feature name exactly as given as the JSON key.";

const LIST_FORMAT_REMINDER: &str = "Answer with a single comma separated list of feature names only, \
no additional text.";

const JSON_FORMAT_REMINDER: &str = concat!(
    "Answer with a single JSON object only, no additional text. ",
    "When a value is not present in the document, use \"N/A\"."
);
