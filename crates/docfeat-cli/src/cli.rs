//! CLI command definitions and argument parsing.

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use docfeat_extractor::{ExtractionMode, MergeStrategyKind};
use docfeat_source::RenderMode;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Docfeat - Extract a table of LLM-discovered features from a folder of PDFs.
#[derive(Debug, Parser)]
#[command(name = "docfeat")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Configuration file path (default: ~/.docfeat/config.toml)
    #[arg(short, long, global = true, env = "DOCFEAT_CONFIG")]
    pub config: Option<PathBuf>,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Load a `.env` file, then parse the arguments
    ///
    /// Loads `env_file` when given, otherwise `.env` from the working
    /// directory or its parents. Loading comes first so the file can supply
    /// `DOCFEAT_CONFIG`. Variables already set in the environment win.
    pub fn try_parse_after_env<I, T>(env_file: Option<&Path>, args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let _ = match env_file {
            Some(path) => dotenvy::from_path(path),
            None => dotenvy::dotenv().map(|_| ()),
        };
        Self::try_parse_from(args)
    }
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Process every PDF in a directory and write the feature table as CSV
    Run(RunArgs),

    /// Write a default configuration file
    Init(InitArgs),
}

/// Arguments for the run command.
#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Directory containing the PDF files
    pub input: PathBuf,

    /// CSV output path ("-" for stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Model name
    #[arg(short, long)]
    pub model: Option<String>,

    /// Chat-completions API root
    #[arg(long)]
    pub base_url: Option<String>,

    /// Environment variable holding the API key
    #[arg(long)]
    pub api_key_env: Option<String>,

    /// Sampling temperature
    #[arg(short, long)]
    pub temperature: Option<f32>,

    /// How documents are handed to the model
    #[arg(short, long, value_enum)]
    pub render: Option<RenderArg>,

    /// One JSON call per document, or one call per feature
    #[arg(long, value_enum)]
    pub mode: Option<ModeArg>,

    /// How proposed features are merged into the schema
    #[arg(long, value_enum)]
    pub merge: Option<MergeArg>,

    /// Skip documents whose model calls fail instead of aborting
    #[arg(long)]
    pub isolate_failures: bool,

    /// Truncate document text to this many characters per prompt (0 = unlimited)
    #[arg(long)]
    pub max_text_chars: Option<usize>,

    /// Summarize each document before proposing features
    #[arg(long)]
    pub summarize: bool,

    /// Do not print the table preview
    #[arg(long)]
    pub no_preview: bool,
}

/// Arguments for the init command.
#[derive(Debug, Parser)]
pub struct InitArgs {
    /// Overwrite an existing configuration file
    #[arg(short, long)]
    pub force: bool,
}

/// Rendering options.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RenderArg {
    /// Extract plain text locally
    Text,
    /// Rasterize pages to PNG (needs the pdfium feature)
    PageImages,
    /// Send the original PDF
    RawPdf,
}

impl From<RenderArg> for RenderMode {
    fn from(arg: RenderArg) -> Self {
        match arg {
            RenderArg::Text => RenderMode::Text,
            RenderArg::PageImages => RenderMode::PageImages,
            RenderArg::RawPdf => RenderMode::RawPdf,
        }
    }
}

/// Extraction mode options.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ModeArg {
    /// One JSON object per document
    Batch,
    /// One call per feature
    PerFeature,
}

impl From<ModeArg> for ExtractionMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Batch => ExtractionMode::Batch,
            ModeArg::PerFeature => ExtractionMode::PerFeature,
        }
    }
}

/// Merge strategy options.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MergeArg {
    /// Let the model combine lists by meaning
    Model,
    /// Local case-folded fuzzy matching
    Normalized,
}

impl From<MergeArg> for MergeStrategyKind {
    fn from(arg: MergeArg) -> Self {
        match arg {
            MergeArg::Model => MergeStrategyKind::Model,
            MergeArg::Normalized => MergeStrategyKind::Normalized,
        }
    }
}

/// Default log filter for the verbosity flags
pub fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}
