//! Output formatting for the CLI.

use colored::*;
use docfeat_domain::{ExtractedRow, ResultTable};
use docfeat_extractor::{PipelineObserver, Stage};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Longest cell shown in the preview
const PREVIEW_CELL_CHARS: usize = 40;

/// Output formatter.
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(color_enabled: bool) -> Self {
        Self { color_enabled }
    }

    /// Format the result table for the terminal.
    pub fn format_table(&self, table: &ResultTable) -> String {
        if table.is_empty() {
            return self.colorize("No rows extracted.", "yellow");
        }

        let mut builder = Builder::default();
        builder.push_record(table.columns.iter().map(|c| shorten(c)));
        for row in &table.rows {
            builder.push_record(row.iter().map(|cell| shorten(cell)));
        }

        let mut rendered = builder.build();
        rendered
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));

        rendered.to_string()
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Format a warning message.
    pub fn warning(&self, message: &str) -> String {
        self.colorize(&format!("⚠ {}", message), "yellow")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            "dimmed" => text.dimmed().to_string(),
            _ => text.to_string(),
        }
    }
}

fn shorten(text: &str) -> String {
    let text = text.replace('\n', " ");
    match text.char_indices().nth(PREVIEW_CELL_CHARS) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text,
    }
}

/// Prints per-document progress to stderr.
pub struct ConsoleProgress {
    formatter: Formatter,
}

impl ConsoleProgress {
    /// Create a progress printer.
    pub fn new(formatter: Formatter) -> Self {
        Self { formatter }
    }

    fn line(&self, index: usize, total: usize, name: &str) -> String {
        let counter = format!("[{}/{}]", index, total);
        format!("{} {}", self.formatter.colorize(&counter, "cyan"), name)
    }
}

impl PipelineObserver for ConsoleProgress {
    fn on_document_start(&self, index: usize, total: usize, name: &str) {
        eprintln!("{}", self.line(index, total, name));
    }

    fn on_stage(&self, _name: &str, stage: Stage) {
        eprintln!("    {}", self.formatter.colorize(&stage.to_string(), "dimmed"));
    }

    fn on_document_done(&self, name: &str, row: &ExtractedRow) {
        let found = row
            .values
            .iter()
            .filter(|(_, value)| !docfeat_domain::is_missing(value))
            .count();
        eprintln!(
            "    {}",
            self.formatter.success(&format!(
                "{}: {} of {} feature(s) found",
                name,
                found,
                row.values.len()
            ))
        );
    }

    fn on_document_skipped(&self, name: &str, reason: &str) {
        eprintln!(
            "    {}",
            self.formatter.warning(&format!("Skipped {}: {}", name, reason))
        );
    }
}
