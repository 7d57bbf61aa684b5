//! Docfeat CLI library.
//!
//! Argument parsing, configuration files, the `run` and `init` commands,
//! and terminal output for the `docfeat` binary.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::{Cli, Command};
pub use config::Config;
pub use error::{CliError, Result};
pub use output::{ConsoleProgress, Formatter};
