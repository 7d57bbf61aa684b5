//! Integration tests for the Pipeline

#[cfg(test)]
mod tests {
    use crate::{
        BatchState, ErrorPolicy, ExtractorConfig, ExtractorError, NormalizedMerge, Pipeline,
        PipelineObserver,
    };
    use docfeat_domain::{
        Attachment, Document, DocumentContent, DocumentSource, ExtractedRow, FeatureName,
        GlobalSchema,
    };
    use docfeat_llm::MockProvider;
    use std::sync::{Arc, Mutex};

    const PROPOSE: &str = "Identify the most important features";
    const MERGE: &str = "Combine the two feature lists";
    const EXTRACT: &str = "FEATURES:";
    const TRANSCRIBE: &str = "Transcribe the attached";

    /// In-memory source; `None` entries fail to render
    struct StubSource {
        entries: Vec<(String, Option<Document>)>,
    }

    impl StubSource {
        fn new() -> Self {
            Self { entries: Vec::new() }
        }

        fn text(self, name: &str, text: &str) -> Self {
            self.document(Document::from_text(name, text))
        }

        fn document(mut self, document: Document) -> Self {
            self.entries.push((document.name().to_string(), Some(document)));
            self
        }

        fn broken(mut self, name: &str) -> Self {
            self.entries.push((name.to_string(), None));
            self
        }
    }

    impl DocumentSource for StubSource {
        type Error = String;

        fn document_names(&self) -> Vec<String> {
            self.entries.iter().map(|(name, _)| name.clone()).collect()
        }

        fn render(&self, name: &str) -> Result<Document, String> {
            self.entries
                .iter()
                .find(|(n, _)| n == name)
                .and_then(|(_, doc)| doc.clone())
                .ok_or_else(|| format!("cannot render {}", name))
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl PipelineObserver for Recorder {
        fn on_document_start(&self, index: usize, total: usize, name: &str) {
            self.events.lock().unwrap().push(format!("start {}/{} {}", index, total, name));
        }

        fn on_document_done(&self, name: &str, row: &ExtractedRow) {
            self.events
                .lock()
                .unwrap()
                .push(format!("done {} ({} values)", name, row.values.len()));
        }

        fn on_document_skipped(&self, name: &str, _reason: &str) {
            self.events.lock().unwrap().push(format!("skip {}", name));
        }
    }

    /// A and C mention revenue; every call about B fails
    fn revenue_mock() -> MockProvider {
        let mut llm = MockProvider::default();
        llm.add_error("DOC-B");
        llm.add_response_all([PROPOSE, "DOC-A"], "Revenue");
        llm.add_response_all([PROPOSE, "DOC-C"], "Revenue");
        llm.add_response_all([MERGE, "LIST 2: Revenue\n"], "Revenue");
        llm.add_response_all([EXTRACT, "DOC-A"], r#"{"Revenue": "$5M"}"#);
        llm.add_response_all([EXTRACT, "DOC-C"], r#"{"Revenue": "$9M"}"#);
        llm
    }

    fn three_documents() -> StubSource {
        StubSource::new()
            .text("A.pdf", "DOC-A revenue was $5M")
            .text("B.pdf", "DOC-B revenue was $7M")
            .text("C.pdf", "DOC-C revenue was $9M")
    }

    #[test]
    fn test_fail_fast_reports_failing_document() {
        let pipeline = Pipeline::new(revenue_mock(), ExtractorConfig::default()).unwrap();

        let result = pipeline.run(&three_documents());
        match result {
            Err(ExtractorError::DocumentFailed { index, name, source }) => {
                assert_eq!(index, 2);
                assert_eq!(name, "B.pdf");
                assert!(matches!(*source, ExtractorError::Llm(_)));
            }
            other => panic!("Expected DocumentFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_fail_fast_error_message_names_document() {
        let pipeline = Pipeline::new(revenue_mock(), ExtractorConfig::default()).unwrap();

        let message = pipeline.run(&three_documents()).unwrap_err().to_string();
        assert!(message.starts_with("Document 2 (B.pdf) failed"), "{}", message);
    }

    #[test]
    fn test_isolate_skips_failing_document() {
        let llm = revenue_mock();
        let pipeline = Pipeline::new(llm.clone(), ExtractorConfig::resilient()).unwrap();

        let outcome = pipeline.run(&three_documents()).unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].index, 2);
        assert_eq!(outcome.skipped[0].name, "B.pdf");

        let sources: Vec<&str> = outcome.rows.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(sources, vec!["A.pdf", "C.pdf"]);
        assert_eq!(outcome.table.cell(1, "Revenue"), Some("$9M"));
        assert_eq!(outcome.table.cell(1, "Source file"), Some("C.pdf"));
    }

    #[test]
    fn test_rendering_failure_is_skipped_under_fail_fast() {
        let source = StubSource::new()
            .text("A.pdf", "DOC-A revenue was $5M")
            .broken("corrupt.pdf")
            .text("C.pdf", "DOC-C revenue was $9M");
        let pipeline = Pipeline::new(revenue_mock(), ExtractorConfig::default()).unwrap();

        let outcome = pipeline.run(&source).unwrap();

        assert_eq!(outcome.rows.len(), 2);
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].name, "corrupt.pdf");
        assert!(outcome.skipped[0].reason.contains("cannot render corrupt.pdf"));
    }

    #[test]
    fn test_empty_source_gives_empty_table() {
        let llm = MockProvider::default();
        let pipeline = Pipeline::new(llm.clone(), ExtractorConfig::default()).unwrap();

        let outcome = pipeline.run(&StubSource::new()).unwrap();

        assert!(outcome.is_empty());
        assert_eq!(outcome.table.columns, vec!["Source file"]);
        assert_eq!(llm.call_count(), 0);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ExtractorConfig {
            similarity_threshold: -0.5,
            ..ExtractorConfig::default()
        };
        let result = Pipeline::new(MockProvider::default(), config);
        assert!(matches!(result, Err(ExtractorError::Config(_))));
    }

    #[test]
    fn test_failed_document_leaves_state_untouched() {
        let mut llm = MockProvider::default();
        llm.add_error(EXTRACT);
        llm.add_response(PROPOSE, "Diagnosis");
        llm.add_response(MERGE, "Revenue, Diagnosis");
        let pipeline = Pipeline::new(llm, ExtractorConfig::default()).unwrap();

        let mut state = BatchState {
            schema: GlobalSchema::from_names(FeatureName::new("Revenue")),
            rows: Vec::new(),
        };
        let document = Document::from_text("D.pdf", "Patient diagnosed with flu");

        let result = pipeline.process_document(&mut state, &document);

        assert!(result.is_err());
        assert_eq!(state.schema.len(), 1);
        assert!(state.rows.is_empty());
    }

    #[test]
    fn test_rows_record_schema_size() {
        let mut llm = MockProvider::default();
        llm.add_response_all([PROPOSE, "DOC-A"], "Revenue");
        llm.add_response_all([PROPOSE, "DOC-B"], "Revenue, Net Income");
        llm.add_response(MERGE, "");
        llm.add_response(EXTRACT, "{}");
        let pipeline = Pipeline::new(llm, ExtractorConfig::default())
            .unwrap()
            .with_merge_strategy(NormalizedMerge::new(1.0));

        let source = StubSource::new()
            .text("A.pdf", "DOC-A")
            .text("B.pdf", "DOC-B");
        let outcome = pipeline.run(&source).unwrap();

        assert_eq!(outcome.rows[0].schema_len, 1);
        assert_eq!(outcome.rows[1].schema_len, 2);
        assert_eq!(outcome.schema.to_delimited(), "Revenue, Net Income");
        // Nothing was found, so only the filename column is left
        assert_eq!(outcome.table.columns, vec!["Source file"]);
    }

    #[test]
    fn test_page_images_are_transcribed_first() {
        let mut llm = MockProvider::default();
        llm.add_response(TRANSCRIBE, "DOC-S Revenue: $3M");
        llm.add_response(PROPOSE, "Revenue");
        llm.add_response(MERGE, "Revenue");
        llm.add_response(EXTRACT, r#"{"Revenue": "$3M"}"#);
        let pipeline = Pipeline::new(llm.clone(), ExtractorConfig::default()).unwrap();

        let pages = vec![Attachment::png(vec![1, 2]), Attachment::png(vec![3, 4])];
        let source = StubSource::new()
            .document(Document::new("scan.pdf", DocumentContent::PageImages(pages)));
        let outcome = pipeline.run(&source).unwrap();

        let requests = llm.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[0].user_prompt.starts_with(TRANSCRIBE));
        assert_eq!(requests[0].attachments.len(), 2);
        assert!(requests[1..].iter().all(|r| r.attachments.is_empty()));
        assert!(requests[1].user_prompt.contains("DOC-S Revenue: $3M"));
        assert_eq!(outcome.table.cell(0, "Revenue"), Some("$3M"));
    }

    #[test]
    fn test_attachments_forwarded_without_transcription() {
        let mut llm = MockProvider::default();
        llm.add_response(PROPOSE, "Revenue");
        llm.add_response(MERGE, "Revenue");
        llm.add_response(EXTRACT, r#"{"Revenue": "$3M"}"#);
        let config = ExtractorConfig {
            transcribe_images: false,
            ..ExtractorConfig::default()
        };
        let pipeline = Pipeline::new(llm.clone(), config).unwrap();

        let pdf = Attachment::pdf("scan.pdf", b"%PDF-1.7".to_vec());
        let source =
            StubSource::new().document(Document::new("scan.pdf", DocumentContent::RawPdf(pdf)));
        pipeline.run(&source).unwrap();

        let requests = llm.requests();
        assert_eq!(requests.len(), 3);
        assert!(!requests.iter().any(|r| r.user_prompt.starts_with(TRANSCRIBE)));
        assert_eq!(requests[0].attachments.len(), 1);
        assert!(requests[0].user_prompt.contains("The document is attached."));
        assert!(requests[1].attachments.is_empty());
        assert_eq!(requests[2].attachments.len(), 1);
    }

    #[test]
    fn test_context_summary_feeds_proposal() {
        let mut llm = MockProvider::default();
        llm.add_response("Summarize what kind of document", "A hospital discharge letter.");
        llm.add_response(PROPOSE, "Diagnosis");
        llm.add_response(MERGE, "Diagnosis");
        llm.add_response(EXTRACT, r#"{"Diagnosis": "Flu"}"#);
        let config = ExtractorConfig {
            summarize_context: true,
            ..ExtractorConfig::default()
        };
        let pipeline = Pipeline::new(llm.clone(), config).unwrap();

        pipeline
            .run(&StubSource::new().text("A.pdf", "Discharged after flu"))
            .unwrap();

        let requests = llm.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[1].user_prompt.contains("Document summary:\nA hospital discharge letter."));
    }

    #[test]
    fn test_every_call_carries_system_prompt() {
        let llm = revenue_mock();
        let config = ExtractorConfig {
            system_prompt: "Be brief.".to_string(),
            ..ExtractorConfig::default()
        };
        let pipeline = Pipeline::new(llm.clone(), config).unwrap();

        pipeline
            .run(&StubSource::new().text("A.pdf", "DOC-A revenue was $5M"))
            .unwrap();

        let requests = llm.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests
            .iter()
            .all(|r| r.system_prompt.as_deref() == Some("Be brief.")));
    }

    #[test]
    fn test_observer_sees_progress() {
        let recorder = Recorder::default();
        let config = ExtractorConfig {
            error_policy: ErrorPolicy::Isolate,
            ..ExtractorConfig::default()
        };
        let pipeline = Pipeline::new(revenue_mock(), config)
            .unwrap()
            .with_observer(recorder.clone());

        let source = StubSource::new()
            .text("A.pdf", "DOC-A revenue was $5M")
            .broken("corrupt.pdf");
        pipeline.run(&source).unwrap();

        assert_eq!(
            recorder.events(),
            vec![
                "start 1/2 A.pdf",
                "done A.pdf (1 values)",
                "start 2/2 corrupt.pdf",
                "skip corrupt.pdf",
            ]
        );
    }
}
