//! Configuration management for the CLI.

use crate::error::{CliError, Result};
use docfeat_extractor::ExtractorConfig;
use docfeat_llm::openai::{
    DEFAULT_BASE_URL, DEFAULT_MAX_RETRIES, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS,
};
use docfeat_llm::OpenAiCompatibleProvider;
use docfeat_source::{RenderMode, Renderer, DEFAULT_DPI};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Model endpoint settings
    #[serde(default)]
    pub provider: ProviderConfig,

    /// Pipeline settings
    #[serde(default)]
    pub extractor: ExtractorConfig,

    /// Document rendering settings
    #[serde(default)]
    pub render: RenderSettings,

    /// Global settings
    #[serde(default)]
    pub settings: Settings,
}

/// Chat-completions endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// API root, without `/chat/completions`
    pub base_url: String,

    /// Model name
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Per-request timeout
    pub timeout_secs: u64,

    /// Attempts per call for transient failures
    pub max_retries: u32,
}

/// Document rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    /// Render mode
    pub mode: RenderMode,

    /// Page-image resolution
    pub dpi: f32,
}

/// Global CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Enable colored output
    #[serde(default = "default_true")]
    pub color: bool,

    /// Print the table before saving
    #[serde(default = "default_true")]
    pub preview: bool,

    /// Default CSV output path
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Config {
    /// Get the default configuration file path.
    pub fn path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| CliError::Config("Could not find home directory".into()))?;
        Ok(home.join(".docfeat").join("config.toml"))
    }

    /// Load configuration.
    ///
    /// An explicit path must exist; a missing default file yields the defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) if !path.exists() => {
                return Err(CliError::Config(format!(
                    "Config file {} does not exist",
                    path.display()
                )));
            }
            Some(path) => path.to_path_buf(),
            None => Self::path()?,
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Renderer for the configured mode.
    pub fn renderer(&self) -> Renderer {
        Renderer::new(self.render.mode).with_dpi(self.render.dpi)
    }
}

impl ProviderConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        match env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(CliError::Config(format!(
                "{} is not set (put it in the environment or a .env file)",
                self.api_key_env
            ))),
        }
    }

    /// Build the HTTP provider.
    pub fn build(&self) -> Result<OpenAiCompatibleProvider> {
        let provider = OpenAiCompatibleProvider::new(&self.base_url, &self.model, self.api_key()?)?
            .with_temperature(self.temperature)
            .with_max_retries(self.max_retries)
            .with_timeout(Duration::from_secs(self.timeout_secs))?;
        Ok(provider)
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            api_key_env: "PPLX_API_KEY".to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            mode: RenderMode::Text,
            dpi: DEFAULT_DPI,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            color: true,
            preview: true,
            output: default_output(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_output() -> PathBuf {
    PathBuf::from("features.csv")
}
