//! Docfeat CLI - extract a feature table from a folder of PDFs.

use anyhow::Context;
use docfeat_cli::cli::log_level;
use docfeat_cli::commands;
use docfeat_cli::{Cli, Command, Config, Formatter};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::try_parse_after_env(None, std::env::args_os()).unwrap_or_else(|e| e.exit());

    // Logs go to stderr so `-o -` keeps stdout clean
    let filter = if cli.verbose > 0 || cli.quiet {
        EnvFilter::new(log_level(cli.verbose, cli.quiet))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let color = !cli.no_color;
    if let Err(e) = run(cli) {
        let formatter = Formatter::new(color);
        eprintln!("{}", formatter.error(&format!("{:#}", e)));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Init(args) => {
            let formatter = Formatter::new(!cli.no_color);
            commands::execute_init(args, cli.config.as_deref(), &formatter)
                .context("Failed to write configuration")?;
        }
        Command::Run(args) => {
            let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
            let formatter = Formatter::new(!cli.no_color && config.settings.color);
            let input = args.input.clone();
            commands::execute_run(args, config, &formatter)
                .with_context(|| format!("Extraction over {} failed", input.display()))?;
        }
    }
    Ok(())
}
