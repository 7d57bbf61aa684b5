//! Batch orchestration
//!
//! Documents are processed strictly in order. Each one goes through
//! transcription (image or PDF content only), optional summary, feature
//! proposal, schema merge, and value extraction. The schema and the row are
//! committed to the [`BatchState`] only after every step for that document
//! has succeeded.

use crate::config::{ErrorPolicy, ExtractorConfig};
use crate::error::ExtractorError;
use crate::extractor::FeatureExtractor;
use crate::reader::DocumentReader;
use crate::schema::{FeatureSchemaBuilder, SchemaMergeStrategy};
use crate::table::TableAssembler;
use crate::types::DocumentInput;
use docfeat_domain::{
    CompletionClient, Document, DocumentContent, DocumentSource, ExtractedRow, GlobalSchema,
    ResultTable,
};
use std::fmt::{self, Display};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Per-document processing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Rendering the PDF
    Rendering,
    /// Transcribing page images or PDF attachments to text
    Transcribing,
    /// Summarizing document type and purpose
    Summarizing,
    /// Asking for candidate features
    Proposing,
    /// Merging candidates into the global schema
    Merging,
    /// Extracting values for every schema feature
    Extracting,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Rendering => "rendering",
            Stage::Transcribing => "transcribing",
            Stage::Summarizing => "summarizing",
            Stage::Proposing => "proposing features",
            Stage::Merging => "merging schema",
            Stage::Extracting => "extracting values",
        };
        f.write_str(label)
    }
}

/// Progress callbacks; every method defaults to doing nothing
pub trait PipelineObserver {
    /// A document is about to be processed (`index` is 1-based)
    fn on_document_start(&self, _index: usize, _total: usize, _name: &str) {}

    /// A document entered a stage
    fn on_stage(&self, _name: &str, _stage: Stage) {}

    /// A document produced its row
    fn on_document_done(&self, _name: &str, _row: &ExtractedRow) {}

    /// A document was skipped
    fn on_document_skipped(&self, _name: &str, _reason: &str) {}
}

struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Running state threaded through the batch
#[derive(Debug, Clone, Default)]
pub struct BatchState {
    /// Global schema after the last successful document
    pub schema: GlobalSchema,

    /// Rows of successful documents, in processing order
    pub rows: Vec<ExtractedRow>,
}

/// A document left out of the table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    /// 1-based position in the batch
    pub index: usize,

    /// Document filename
    pub name: String,

    /// Why it was skipped
    pub reason: String,
}

/// Result of a batch run
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    /// Assembled table, all-missing columns dropped
    pub table: ResultTable,

    /// Final global schema
    pub schema: GlobalSchema,

    /// Rows as extracted, before alignment
    pub rows: Vec<ExtractedRow>,

    /// Documents that produced no row
    pub skipped: Vec<SkippedDocument>,
}

impl BatchOutcome {
    /// Whether no document produced a row
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Sequential feature-discovery and extraction pipeline
pub struct Pipeline<C> {
    config: ExtractorConfig,
    reader: DocumentReader<C>,
    schema_builder: FeatureSchemaBuilder<C>,
    extractor: FeatureExtractor<C>,
    assembler: TableAssembler,
    observer: Box<dyn PipelineObserver>,
}

impl<C> Pipeline<C>
where
    C: CompletionClient + 'static,
    C::Error: Display,
{
    /// Create a pipeline over a completion client
    ///
    /// # Errors
    ///
    /// Returns error if the configuration is invalid.
    pub fn new(client: C, config: ExtractorConfig) -> Result<Self, ExtractorError> {
        config.validate().map_err(ExtractorError::Config)?;

        let client = Arc::new(client);
        let reader = DocumentReader::new(Arc::clone(&client), config.system_prompt.clone())
            .with_max_text_chars(config.max_text_chars);
        let schema_builder = FeatureSchemaBuilder::new(Arc::clone(&client), &config);
        let extractor = FeatureExtractor::new(client, &config);
        let assembler = TableAssembler::new(config.filename_column.clone());

        Ok(Self {
            config,
            reader,
            schema_builder,
            extractor,
            assembler,
            observer: Box::new(NoopObserver),
        })
    }

    /// Receive progress callbacks
    pub fn with_observer(mut self, observer: impl PipelineObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Replace the schema merge strategy chosen by the config
    pub fn with_merge_strategy(mut self, merge: impl SchemaMergeStrategy + 'static) -> Self {
        self.schema_builder = self.schema_builder.with_merge_strategy(merge);
        self
    }

    /// The active configuration
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Process every document the source lists and assemble the table
    ///
    /// Documents that fail to render are skipped. A completion failure
    /// aborts the batch under [`ErrorPolicy::FailFast`] and skips the
    /// document under [`ErrorPolicy::Isolate`].
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::DocumentFailed`] naming the document whose
    /// processing failed when the policy is fail-fast.
    pub fn run<S>(&self, source: &S) -> Result<BatchOutcome, ExtractorError>
    where
        S: DocumentSource,
        S::Error: Display,
    {
        let names = source.document_names();
        let total = names.len();
        if total == 0 {
            warn!("No documents to process");
        }

        info!(
            "Starting batch of {} document(s) (mode: {:?}, merge: {})",
            total,
            self.config.extraction_mode,
            self.schema_builder.merge_strategy_name()
        );

        let mut state = BatchState::default();
        let mut skipped = Vec::new();

        for (position, name) in names.iter().enumerate() {
            let index = position + 1;
            info!("Processing {}/{} [{}]", index, total, name);
            self.observer.on_document_start(index, total, name);
            self.observer.on_stage(name, Stage::Rendering);

            let document = match source.render(name) {
                Ok(document) => document,
                Err(e) => {
                    let reason = ExtractorError::Rendering(e.to_string()).to_string();
                    warn!("Skipping {}: {}", name, reason);
                    self.observer.on_document_skipped(name, &reason);
                    skipped.push(SkippedDocument {
                        index,
                        name: name.clone(),
                        reason,
                    });
                    continue;
                }
            };

            match self.process_document(&mut state, &document) {
                Ok(()) => {
                    if let Some(row) = state.rows.last() {
                        self.observer.on_document_done(name, row);
                    }
                }
                Err(e) => match self.config.error_policy {
                    ErrorPolicy::FailFast => {
                        return Err(ExtractorError::DocumentFailed {
                            index,
                            name: name.clone(),
                            source: Box::new(e),
                        });
                    }
                    ErrorPolicy::Isolate => {
                        let reason = e.to_string();
                        warn!("Skipping {}: {}", name, reason);
                        self.observer.on_document_skipped(name, &reason);
                        skipped.push(SkippedDocument {
                            index,
                            name: name.clone(),
                            reason,
                        });
                    }
                },
            }
        }

        let table = self.assembler.assemble(&state.rows);
        info!(
            "Batch complete: {} row(s), {} column(s), {} skipped",
            table.len(),
            table.columns.len(),
            skipped.len()
        );

        Ok(BatchOutcome {
            table,
            schema: state.schema,
            rows: state.rows,
            skipped,
        })
    }

    /// Run every stage for one rendered document
    ///
    /// On success the merged schema replaces `state.schema` and the row is
    /// appended. On error `state` is left untouched.
    pub fn process_document(
        &self,
        state: &mut BatchState,
        document: &Document,
    ) -> Result<(), ExtractorError> {
        let name = document.name();

        let (text, attachments) = match document.content() {
            DocumentContent::Text(text) => (text.clone(), Vec::new()),
            content if self.config.transcribe_images => {
                self.observer.on_stage(name, Stage::Transcribing);
                (self.reader.transcribe(name, &content.attachments())?, Vec::new())
            }
            content => (String::new(), content.attachments()),
        };

        let base = DocumentInput::text(name, &text).with_attachments(&attachments);

        let summary = if self.config.summarize_context {
            self.observer.on_stage(name, Stage::Summarizing);
            Some(self.reader.summarize(&base)?)
        } else {
            None
        };
        let input = base.with_context(summary.as_deref());

        self.observer.on_stage(name, Stage::Proposing);
        let proposed = self.schema_builder.propose_features(&input)?;

        self.observer.on_stage(name, Stage::Merging);
        let schema = self.schema_builder.merge_features(&state.schema, &proposed)?;

        self.observer.on_stage(name, Stage::Extracting);
        let values = self.extractor.extract(&schema, &input)?;
        debug!("Extracted {} value(s) from {}", values.len(), name);

        let row = ExtractedRow::new(name, values, schema.len());
        state.schema = schema;
        state.rows.push(row);
        Ok(())
    }
}
