//! Configuration for the Extractor

use serde::{Deserialize, Serialize};

/// How feature values are requested from the model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// One prompt per document returning a JSON object for every feature
    #[default]
    Batch,
    /// One prompt per feature returning a single-key JSON object
    PerFeature,
}

/// How newly proposed features are merged into the global schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeStrategyKind {
    /// Ask the model to combine both lists, dropping items that mean the same
    #[default]
    Model,
    /// Local case-folded comparison with a Levenshtein similarity threshold
    Normalized,
}

/// What happens when a completion call fails mid-batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Abort the whole batch, reporting the failing document
    #[default]
    FailFast,
    /// Skip the failing document and continue
    Isolate,
}

/// Default system prompt sent with every completion
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are an experienced document analyzer, expert in processing \
documents and extracting meaningful information from them. Keep answers short and concise, in plain simple text.";

/// Configuration for the Extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Batch or per-feature value extraction
    pub extraction_mode: ExtractionMode,

    /// Schema merge strategy
    pub merge_strategy: MergeStrategyKind,

    /// Similarity (0.0-1.0) at which the normalized merge treats names as equal
    pub similarity_threshold: f64,

    /// Maximum document characters per prompt (0 = unlimited)
    pub max_text_chars: usize,

    /// Batch-fatal or per-document isolation on completion failures
    pub error_policy: ErrorPolicy,

    /// Transcribe image/PDF attachments to text before feature discovery
    pub transcribe_images: bool,

    /// Summarize document type and purpose before proposing features
    pub summarize_context: bool,

    /// Header of the document-identifier column
    pub filename_column: String,

    /// System prompt sent with every completion
    pub system_prompt: String,
}

impl ExtractorConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err("similarity_threshold must be between 0.0 and 1.0".to_string());
        }
        if self.filename_column.trim().is_empty() {
            return Err("filename_column must not be empty".to_string());
        }
        Ok(())
    }
}

impl Default for ExtractorConfig {
    /// Default configuration, one batch JSON call per document
    fn default() -> Self {
        Self {
            extraction_mode: ExtractionMode::Batch,
            merge_strategy: MergeStrategyKind::Model,
            similarity_threshold: 0.85,
            max_text_chars: 0,
            error_policy: ErrorPolicy::FailFast,
            transcribe_images: true,
            summarize_context: false,
            filename_column: docfeat_domain::DEFAULT_FILENAME_COLUMN.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl ExtractorConfig {
    /// Per-feature preset: one call per feature with truncated document text
    pub fn per_feature() -> Self {
        Self {
            extraction_mode: ExtractionMode::PerFeature,
            max_text_chars: 12_000,
            ..Self::default()
        }
    }

    /// Resilient preset: failed documents are skipped instead of aborting
    pub fn resilient() -> Self {
        Self {
            error_policy: ErrorPolicy::Isolate,
            ..Self::default()
        }
    }

    /// Load configuration from TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse TOML: {}", e))
    }

    /// Serialize configuration to TOML string
    pub fn to_toml(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize to TOML: {}", e))
    }
}
