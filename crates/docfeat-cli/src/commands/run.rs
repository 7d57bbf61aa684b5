//! Run command implementation.

use crate::cli::RunArgs;
use crate::config::Config;
use crate::error::{CliError, Result};
use crate::output::{ConsoleProgress, Formatter};
use docfeat_domain::{CompletionClient, DocumentSource};
use docfeat_extractor::{save_csv, write_csv, BatchOutcome, ErrorPolicy, Pipeline};
use docfeat_source::DirectorySource;
use std::fmt::Display;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

/// Execute the run command.
pub fn execute_run(args: RunArgs, mut config: Config, formatter: &Formatter) -> Result<()> {
    apply_overrides(&mut config, &args);
    config.extractor.validate().map_err(CliError::Config)?;

    let source = DirectorySource::open(&args.input, config.renderer())?;
    if source.document_names().is_empty() {
        return Err(CliError::NoDocuments(args.input.clone()));
    }

    let provider = config.provider.build()?;
    info!("Using model {} at {}", provider.model(), config.provider.base_url);

    let output = args.output.clone().unwrap_or_else(|| config.settings.output.clone());
    let preview = config.settings.preview && !args.no_preview && !is_stdout(&output);

    let outcome = extract(provider, &config, &source, formatter)?;
    write_outcome(&outcome, &output, preview, formatter)
}

/// Fold command-line flags over the loaded configuration.
pub fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(model) = &args.model {
        config.provider.model = model.clone();
    }
    if let Some(base_url) = &args.base_url {
        config.provider.base_url = base_url.clone();
    }
    if let Some(api_key_env) = &args.api_key_env {
        config.provider.api_key_env = api_key_env.clone();
    }
    if let Some(temperature) = args.temperature {
        config.provider.temperature = temperature;
    }
    if let Some(render) = args.render {
        config.render.mode = render.into();
    }
    if let Some(mode) = args.mode {
        config.extractor.extraction_mode = mode.into();
    }
    if let Some(merge) = args.merge {
        config.extractor.merge_strategy = merge.into();
    }
    if args.isolate_failures {
        config.extractor.error_policy = ErrorPolicy::Isolate;
    }
    if let Some(max_text_chars) = args.max_text_chars {
        config.extractor.max_text_chars = max_text_chars;
    }
    if args.summarize {
        config.extractor.summarize_context = true;
    }
}

/// Run the pipeline over a source with progress printed to stderr.
pub fn extract<C, S>(
    client: C,
    config: &Config,
    source: &S,
    formatter: &Formatter,
) -> Result<BatchOutcome>
where
    C: CompletionClient + 'static,
    C::Error: Display,
    S: DocumentSource,
    S::Error: Display,
{
    let pipeline = Pipeline::new(client, config.extractor.clone())?
        .with_observer(ConsoleProgress::new(*formatter));
    let outcome = pipeline.run(source)?;

    for skipped in &outcome.skipped {
        eprintln!(
            "{}",
            formatter.warning(&format!(
                "Document {} ({}) skipped: {}",
                skipped.index, skipped.name, skipped.reason
            ))
        );
    }

    if outcome.is_empty() {
        return Err(CliError::NoRows(outcome.skipped.len()));
    }
    Ok(outcome)
}

/// Preview and persist the table.
pub fn write_outcome(
    outcome: &BatchOutcome,
    output: &Path,
    preview: bool,
    formatter: &Formatter,
) -> Result<()> {
    if is_stdout(output) {
        write_csv(&outcome.table, io::stdout().lock())?;
        return Ok(());
    }

    if preview {
        println!("{}", formatter.format_table(&outcome.table));
    }

    save_csv(&outcome.table, output)?;
    println!(
        "{}",
        formatter.success(&format!(
            "Saved {} row(s), {} column(s) to {}",
            outcome.table.len(),
            outcome.table.columns.len(),
            output.display()
        ))
    );
    println!(
        "{}",
        formatter.info(&format!(
            "Discovered {} feature(s): {}",
            outcome.schema.len(),
            outcome.schema.to_delimited()
        ))
    );
    Ok(())
}

fn is_stdout(output: &Path) -> bool {
    output == PathBuf::from("-")
}
