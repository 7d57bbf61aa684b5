//! Feature discovery and global schema merging

use crate::config::{ExtractorConfig, MergeStrategyKind};
use crate::error::ExtractorError;
use crate::parser::parse_list;
use crate::prompt::{merge_prompt, PromptBuilder};
use crate::types::{complete, DocumentInput};
use docfeat_domain::{CompletionClient, FeatureName, GlobalSchema};
use std::fmt::Display;
use std::sync::Arc;
use strsim::normalized_levenshtein;
use tracing::{debug, info, warn};

/// Combines the running schema with one document's proposed features
pub trait SchemaMergeStrategy {
    /// Produce the next global schema
    fn merge(
        &self,
        existing: &GlobalSchema,
        proposed: &[FeatureName],
    ) -> Result<GlobalSchema, ExtractorError>;

    /// Short name for logging
    fn name(&self) -> &'static str;
}

/// Delegates the union to the model, which drops items that mean the same thing
///
/// The model's list replaces the schema. Only exact duplicates are removed
/// locally; dropped or renamed features are accepted as the model returns them.
pub struct ModelMerge<C> {
    client: Arc<C>,
    system_prompt: String,
}

impl<C> ModelMerge<C> {
    /// Create a model-driven merge over the given client
    pub fn new(client: Arc<C>, system_prompt: impl Into<String>) -> Self {
        Self {
            client,
            system_prompt: system_prompt.into(),
        }
    }
}

impl<C> SchemaMergeStrategy for ModelMerge<C>
where
    C: CompletionClient,
    C::Error: Display,
{
    fn merge(
        &self,
        existing: &GlobalSchema,
        proposed: &[FeatureName],
    ) -> Result<GlobalSchema, ExtractorError> {
        let prompt = merge_prompt(existing, proposed);
        let reply = complete(self.client.as_ref(), &self.system_prompt, prompt, &[])?;
        let merged = GlobalSchema::from_names(parse_list(&reply).into_inner());

        if merged.is_empty() && !(existing.is_empty() && proposed.is_empty()) {
            warn!("Schema merge returned no features; continuing with an empty schema");
        }

        let dropped = existing.iter().filter(|f| !merged.contains(f.as_str())).count();
        if dropped > 0 {
            debug!("Schema merge dropped or renamed {} existing feature(s)", dropped);
        }

        Ok(merged)
    }

    fn name(&self) -> &'static str {
        "model"
    }
}

/// Deterministic local merge
///
/// Names are compared case-folded with whitespace collapsed; a proposed name
/// whose normalized Levenshtein similarity to a known name reaches the
/// threshold is treated as a duplicate. New names are appended in order.
#[derive(Debug, Clone)]
pub struct NormalizedMerge {
    threshold: f64,
}

impl NormalizedMerge {
    /// Create a merge with the given similarity threshold (0.0-1.0)
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(0.0, 1.0),
        }
    }

    fn is_duplicate(&self, known: &str, candidate: &str) -> bool {
        known == candidate || normalized_levenshtein(known, candidate) >= self.threshold
    }
}

impl SchemaMergeStrategy for NormalizedMerge {
    fn merge(
        &self,
        existing: &GlobalSchema,
        proposed: &[FeatureName],
    ) -> Result<GlobalSchema, ExtractorError> {
        let mut merged = existing.clone();
        let mut known: Vec<String> = merged.iter().map(|f| normalize(f.as_str())).collect();

        for name in proposed {
            let key = normalize(name.as_str());
            if known.iter().any(|k| self.is_duplicate(k, &key)) {
                continue;
            }
            merged.push(name.clone());
            known.push(key);
        }

        Ok(merged)
    }

    fn name(&self) -> &'static str {
        "normalized"
    }
}

fn normalize(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Discovers candidate features per document and folds them into the schema
pub struct FeatureSchemaBuilder<C> {
    client: Arc<C>,
    system_prompt: String,
    max_text_chars: usize,
    merge: Box<dyn SchemaMergeStrategy>,
}

impl<C> FeatureSchemaBuilder<C>
where
    C: CompletionClient + 'static,
    C::Error: Display,
{
    /// Create a builder using the merge strategy named in the config
    pub fn new(client: Arc<C>, config: &ExtractorConfig) -> Self {
        let merge: Box<dyn SchemaMergeStrategy> = match config.merge_strategy {
            MergeStrategyKind::Model => Box::new(ModelMerge::new(
                Arc::clone(&client),
                config.system_prompt.clone(),
            )),
            MergeStrategyKind::Normalized => {
                Box::new(NormalizedMerge::new(config.similarity_threshold))
            }
        };

        Self {
            client,
            system_prompt: config.system_prompt.clone(),
            max_text_chars: config.max_text_chars,
            merge,
        }
    }

    /// Replace the merge strategy
    pub fn with_merge_strategy(mut self, merge: impl SchemaMergeStrategy + 'static) -> Self {
        self.merge = Box::new(merge);
        self
    }

    /// Name of the active merge strategy
    pub fn merge_strategy_name(&self) -> &'static str {
        self.merge.name()
    }

    /// Ask the model which features are worth extracting from this document
    ///
    /// Zero proposals is a valid answer.
    pub fn propose_features(
        &self,
        input: &DocumentInput<'_>,
    ) -> Result<Vec<FeatureName>, ExtractorError> {
        let prompt = PromptBuilder::new(input.text)
            .with_max_chars(self.max_text_chars)
            .with_context(input.context)
            .propose();

        let reply = complete(
            self.client.as_ref(),
            &self.system_prompt,
            prompt,
            input.attachments,
        )?;

        let outcome = parse_list(&reply);
        if outcome.is_fallback() {
            debug!("Proposal reply for {} used fallback parsing", input.name);
        }
        let proposed = outcome.into_inner();

        info!("Proposed {} feature(s) for {}", proposed.len(), input.name);
        Ok(proposed)
    }

    /// Merge proposed features into the running schema
    pub fn merge_features(
        &self,
        existing: &GlobalSchema,
        proposed: &[FeatureName],
    ) -> Result<GlobalSchema, ExtractorError> {
        let merged = self.merge.merge(existing, proposed)?;
        info!(
            "Merged schema ({}): {} -> {} feature(s)",
            self.merge.name(),
            existing.len(),
            merged.len()
        );
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docfeat_llm::MockProvider;

    fn names(items: &[&str]) -> Vec<FeatureName> {
        items.iter().filter_map(|n| FeatureName::new(n)).collect()
    }

    fn schema(items: &[&str]) -> GlobalSchema {
        GlobalSchema::from_names(names(items))
    }

    fn as_strings(schema: &GlobalSchema) -> Vec<&str> {
        schema.iter().map(FeatureName::as_str).collect()
    }

    #[test]
    fn test_propose_features_parses_list() {
        let provider = MockProvider::new("Revenue, Expenses ,  Profit Margins");
        let builder = FeatureSchemaBuilder::new(Arc::new(provider), &ExtractorConfig::default());

        let proposed = builder
            .propose_features(&DocumentInput::text("A.pdf", "some text"))
            .unwrap();
        let proposed: Vec<&str> = proposed.iter().map(FeatureName::as_str).collect();
        assert_eq!(proposed, vec!["Revenue", "Expenses", "Profit Margins"]);
    }

    #[test]
    fn test_propose_features_tolerates_empty_reply() {
        let provider = MockProvider::new("");
        let builder = FeatureSchemaBuilder::new(Arc::new(provider), &ExtractorConfig::default());

        let proposed = builder
            .propose_features(&DocumentInput::text("A.pdf", "some text"))
            .unwrap();
        assert!(proposed.is_empty());
    }

    #[test]
    fn test_propose_forwards_attachments_and_context() {
        let provider = MockProvider::new("Revenue");
        let builder =
            FeatureSchemaBuilder::new(Arc::new(provider.clone()), &ExtractorConfig::default());

        let pages = vec![docfeat_domain::Attachment::png(vec![1])];
        let input = DocumentInput::text("A.pdf", "")
            .with_attachments(&pages)
            .with_context(Some("A tax form."));
        builder.propose_features(&input).unwrap();

        let request = &provider.requests()[0];
        assert_eq!(request.attachments.len(), 1);
        assert!(request.user_prompt.contains("A tax form."));
    }

    #[test]
    fn test_model_merge_replaces_schema() {
        let provider = MockProvider::new("Revenue, Diagnosis, Revenue");
        let merge = ModelMerge::new(Arc::new(provider.clone()), "system");

        let merged = merge
            .merge(&schema(&["Total Revenue"]), &names(&["Revenue", "Diagnosis"]))
            .unwrap();

        assert_eq!(as_strings(&merged), vec!["Revenue", "Diagnosis"]);
        let prompt = &provider.requests()[0].user_prompt;
        assert!(prompt.contains("LIST 1: Total Revenue"));
        assert!(prompt.contains("LIST 2: Revenue, Diagnosis"));
    }

    #[test]
    fn test_model_merge_accepts_empty_reply() {
        let provider = MockProvider::new("   ");
        let merge = ModelMerge::new(Arc::new(provider), "system");

        let merged = merge.merge(&schema(&["Revenue"]), &names(&["Diagnosis"])).unwrap();
        assert!(merged.is_empty());
    }

    #[test]
    fn test_model_merge_called_for_first_document() {
        let provider = MockProvider::new("Revenue");
        let builder =
            FeatureSchemaBuilder::new(Arc::new(provider.clone()), &ExtractorConfig::default());

        let merged = builder
            .merge_features(&GlobalSchema::new(), &names(&["revenue"]))
            .unwrap();

        assert_eq!(as_strings(&merged), vec!["Revenue"]);
        assert_eq!(provider.call_count(), 1);
    }

    #[test]
    fn test_model_merge_error_propagates() {
        let mut provider = MockProvider::default();
        provider.add_error("Combine");
        let merge = ModelMerge::new(Arc::new(provider), "system");

        let result = merge.merge(&schema(&["Revenue"]), &names(&["Diagnosis"]));
        assert!(matches!(result, Err(ExtractorError::Llm(_))));
    }

    #[test]
    fn test_normalized_merge_dedups_case_and_spacing() {
        let merge = NormalizedMerge::new(1.0);
        let merged = merge
            .merge(
                &schema(&["Revenue", "Net Income"]),
                &names(&["revenue", "net   income", "Diagnosis"]),
            )
            .unwrap();

        assert_eq!(as_strings(&merged), vec!["Revenue", "Net Income", "Diagnosis"]);
    }

    #[test]
    fn test_normalized_merge_similarity_threshold() {
        let existing = schema(&["Patient Name"]);
        let proposed = names(&["Patient Names"]);

        let strict = NormalizedMerge::new(1.0).merge(&existing, &proposed).unwrap();
        assert_eq!(strict.len(), 2);

        let lenient = NormalizedMerge::new(0.85).merge(&existing, &proposed).unwrap();
        assert_eq!(as_strings(&lenient), vec!["Patient Name"]);
    }

    #[test]
    fn test_normalized_merge_dedups_within_proposal() {
        let merged = NormalizedMerge::new(1.0)
            .merge(&GlobalSchema::new(), &names(&["Revenue", "REVENUE", "Expenses"]))
            .unwrap();
        assert_eq!(as_strings(&merged), vec!["Revenue", "Expenses"]);
    }

    #[test]
    fn test_config_selects_normalized_merge() {
        let config = ExtractorConfig {
            merge_strategy: MergeStrategyKind::Normalized,
            ..ExtractorConfig::default()
        };
        let provider = MockProvider::default();
        let builder = FeatureSchemaBuilder::new(Arc::new(provider.clone()), &config);

        assert_eq!(builder.merge_strategy_name(), "normalized");
        builder
            .merge_features(&schema(&["Revenue"]), &names(&["revenue"]))
            .unwrap();
        assert_eq!(provider.call_count(), 0);
    }

    #[test]
    fn test_with_merge_strategy_overrides() {
        let builder = FeatureSchemaBuilder::new(
            Arc::new(MockProvider::default()),
            &ExtractorConfig::default(),
        )
        .with_merge_strategy(NormalizedMerge::new(0.9));
        assert_eq!(builder.merge_strategy_name(), "normalized");
    }
}
