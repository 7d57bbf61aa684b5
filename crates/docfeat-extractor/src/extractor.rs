//! Per-document feature value extraction

use crate::config::{ExtractionMode, ExtractorConfig};
use crate::error::ExtractorError;
use crate::parser::parse_object;
use crate::prompt::PromptBuilder;
use crate::types::{complete, DocumentInput};
use docfeat_domain::{
    is_missing, CompletionClient, FeatureMap, FeatureName, GlobalSchema, MISSING_SENTINEL,
};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{debug, warn};

/// Asks the model for a value per schema feature
///
/// Every feature in the schema is present in the returned map. Values the
/// model left out, or replies that cannot be parsed, resolve to "N/A".
pub struct FeatureExtractor<C> {
    client: Arc<C>,
    system_prompt: String,
    mode: ExtractionMode,
    max_text_chars: usize,
}

impl<C> FeatureExtractor<C>
where
    C: CompletionClient,
    C::Error: Display,
{
    /// Create an extractor from the config's mode and truncation settings
    pub fn new(client: Arc<C>, config: &ExtractorConfig) -> Self {
        Self {
            client,
            system_prompt: config.system_prompt.clone(),
            mode: config.extraction_mode,
            max_text_chars: config.max_text_chars,
        }
    }

    /// The active extraction mode
    pub fn mode(&self) -> ExtractionMode {
        self.mode
    }

    /// Extract a value for every schema feature
    ///
    /// # Errors
    ///
    /// Only completion failures are errors; malformed replies become "N/A".
    pub fn extract(
        &self,
        schema: &GlobalSchema,
        input: &DocumentInput<'_>,
    ) -> Result<FeatureMap, ExtractorError> {
        if schema.is_empty() {
            debug!("Empty schema, nothing to extract from {}", input.name);
            return Ok(FeatureMap::new());
        }

        match self.mode {
            ExtractionMode::Batch => self.extract_batch(schema, input),
            ExtractionMode::PerFeature => self.extract_per_feature(schema, input),
        }
    }

    fn extract_batch(
        &self,
        schema: &GlobalSchema,
        input: &DocumentInput<'_>,
    ) -> Result<FeatureMap, ExtractorError> {
        let prompt = self.prompt_builder(input).extract(schema);
        let reply = self.ask(prompt, input)?;

        let outcome = parse_object(&reply);
        if outcome.is_fallback() {
            warn!("Could not parse values for {}, using N/A", input.name);
        }

        Ok(align_to_schema(schema, &outcome.into_inner()))
    }

    fn extract_per_feature(
        &self,
        schema: &GlobalSchema,
        input: &DocumentInput<'_>,
    ) -> Result<FeatureMap, ExtractorError> {
        let builder = self.prompt_builder(input);
        let mut values = FeatureMap::new();
        let mut extras: Vec<(FeatureName, String)> = Vec::new();

        for feature in schema {
            let reply = self.ask(builder.extract_feature(feature), input)?;
            let parsed = parse_object(&reply).into_inner();

            let matched = lookup(&parsed, feature.as_str()).or_else(|| single_entry(&parsed));
            let value = matched
                .map(|(_, value)| value)
                .filter(|v| !is_missing(v))
                .unwrap_or(MISSING_SENTINEL);
            values.insert(feature.clone(), value);

            // Keys naming no schema feature are kept, as in batch mode
            let matched_key = matched.map(|(key, _)| key.as_str());
            for (key, extra) in parsed.iter() {
                if Some(key.as_str()) != matched_key && !names_schema_feature(schema, key) {
                    extras.push((key.clone(), extra.to_string()));
                }
            }
        }

        for (key, value) in extras {
            if !values.contains(key.as_str()) {
                values.insert(key, value);
            }
        }

        Ok(values)
    }

    fn prompt_builder<'a>(&self, input: &DocumentInput<'a>) -> PromptBuilder<'a> {
        PromptBuilder::new(input.text).with_max_chars(self.max_text_chars)
    }

    fn ask(&self, prompt: String, input: &DocumentInput<'_>) -> Result<String, ExtractorError> {
        complete(
            self.client.as_ref(),
            &self.system_prompt,
            prompt,
            input.attachments,
        )
    }
}

/// Map a parsed reply onto the schema
///
/// Exact key matches are taken first for every feature, then the remaining
/// features match unclaimed keys case-insensitively. Each reply key fills at
/// most one feature. Features with no matching key get "N/A". Reply keys
/// that matched no feature are kept after the schema features.
fn align_to_schema(schema: &GlobalSchema, parsed: &FeatureMap) -> FeatureMap {
    let entries: Vec<(&FeatureName, &str)> = parsed.iter().collect();
    let mut consumed = vec![false; entries.len()];
    let mut found: Vec<Option<usize>> = vec![None; schema.len()];

    for (slot, feature) in found.iter_mut().zip(schema) {
        *slot = claim(&entries, &mut consumed, |key| key == feature.as_str());
    }
    for (slot, feature) in found.iter_mut().zip(schema) {
        if slot.is_none() {
            let wanted = feature.as_str().to_lowercase();
            *slot = claim(&entries, &mut consumed, |key| key.to_lowercase() == wanted);
        }
    }

    let mut values = FeatureMap::new();
    for (slot, feature) in found.iter().zip(schema) {
        let value = slot.map_or(MISSING_SENTINEL, |idx| entries[idx].1);
        let value = if is_missing(value) { MISSING_SENTINEL } else { value };
        values.insert(feature.clone(), value);
    }

    for (idx, (key, value)) in entries.iter().enumerate() {
        if !consumed[idx] && !values.contains(key.as_str()) {
            values.insert((*key).clone(), *value);
        }
    }

    values
}

fn claim(
    entries: &[(&FeatureName, &str)],
    consumed: &mut [bool],
    matches: impl Fn(&str) -> bool,
) -> Option<usize> {
    let idx = entries
        .iter()
        .enumerate()
        .position(|(idx, (key, _))| !consumed[idx] && matches(key.as_str()))?;
    consumed[idx] = true;
    Some(idx)
}

fn lookup<'m>(parsed: &'m FeatureMap, feature: &str) -> Option<(&'m FeatureName, &'m str)> {
    let wanted = feature.to_lowercase();
    parsed
        .iter()
        .find(|(key, _)| key.as_str() == feature)
        .or_else(|| parsed.iter().find(|(key, _)| key.as_str().to_lowercase() == wanted))
}

fn single_entry(parsed: &FeatureMap) -> Option<(&FeatureName, &str)> {
    match parsed.len() {
        1 => parsed.iter().next(),
        _ => None,
    }
}

fn names_schema_feature(schema: &GlobalSchema, key: &FeatureName) -> bool {
    let key = key.as_str().to_lowercase();
    schema.iter().any(|feature| feature.as_str().to_lowercase() == key)
}
