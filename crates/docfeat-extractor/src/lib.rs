//! Docfeat Extractor
//!
//! Turns a batch of rendered documents into one table of features
//! discovered by a language model.
//!
//! # Overview
//!
//! For each document, in order, the pipeline:
//!
//! 1. transcribes page images or PDF attachments to text (text documents skip this)
//! 2. asks the model which features are worth extracting from this document
//! 3. merges the proposals into the running global schema
//! 4. asks for a value per schema feature, "N/A" when absent
//!
//! After the last document the rows are aligned into one table, columns that
//! are "N/A" in every row are dropped, and the table can be written as CSV.
//!
//! # Architecture
//!
//! ```text
//! DocumentSource → Pipeline → FeatureSchemaBuilder ─┐
//!                          └→ FeatureExtractor ─────┴→ CompletionClient
//!                          └→ TableAssembler → CSV
//! ```
//!
//! Model output is never trusted to be well formed: [`parser`] turns free
//! text into lists and value maps without failing.
//!
//! # Example Usage
//!
//! ```
//! use docfeat_domain::{Document, DocumentSource};
//! use docfeat_extractor::{ExtractorConfig, Pipeline};
//! use docfeat_llm::MockProvider;
//!
//! struct Memory(Vec<Document>);
//!
//! impl DocumentSource for Memory {
//!     type Error = String;
//!
//!     fn document_names(&self) -> Vec<String> {
//!         self.0.iter().map(|d| d.name().to_string()).collect()
//!     }
//!
//!     fn render(&self, name: &str) -> Result<Document, String> {
//!         self.0.iter().find(|d| d.name() == name).cloned().ok_or_else(|| name.to_string())
//!     }
//! }
//!
//! let mut llm = MockProvider::default();
//! llm.add_response("Identify the most important features", "Revenue");
//! llm.add_response("Combine the two feature lists", "Revenue");
//! llm.add_response("FEATURES: Revenue", r#"{"Revenue": "$5M"}"#);
//!
//! let pipeline = Pipeline::new(llm, ExtractorConfig::default()).unwrap();
//! let source = Memory(vec![Document::from_text("A.pdf", "Revenue was $5M.")]);
//! let outcome = pipeline.run(&source).unwrap();
//!
//! assert_eq!(outcome.table.columns, vec!["Revenue", "Source file"]);
//! assert_eq!(outcome.table.cell(0, "Revenue"), Some("$5M"));
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod extractor;
pub mod parser;
mod pipeline;
mod prompt;
mod reader;
mod schema;
mod table;
mod types;

#[cfg(test)]
mod tests;

pub use config::{
    ErrorPolicy, ExtractionMode, ExtractorConfig, MergeStrategyKind, DEFAULT_SYSTEM_PROMPT,
};
pub use error::ExtractorError;
pub use extractor::FeatureExtractor;
pub use parser::ParseOutcome;
pub use pipeline::{
    BatchOutcome, BatchState, Pipeline, PipelineObserver, SkippedDocument, Stage,
};
pub use reader::DocumentReader;
pub use schema::{FeatureSchemaBuilder, ModelMerge, NormalizedMerge, SchemaMergeStrategy};
pub use table::{save_csv, write_csv, TableAssembler};
pub use types::DocumentInput;
