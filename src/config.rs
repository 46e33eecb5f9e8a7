//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.nfchat.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".nfchat.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Input data settings.
    #[serde(default)]
    pub data: DataConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,

    /// Log level (error, warn, info, debug, trace).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Generation request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Health check timeout in seconds.
    #[serde(default = "default_health_timeout")]
    pub health_timeout_seconds: u64,

    /// Whether to ask the model to rephrase answers at all.
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            timeout_seconds: default_timeout(),
            health_timeout_seconds: default_health_timeout(),
            enabled: true,
        }
    }
}

fn default_model() -> String {
    "llama3".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_health_timeout() -> u64 {
    5
}

fn default_true() -> bool {
    true
}

/// Input CSV settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Invoice header CSV.
    #[serde(default = "default_header_csv")]
    pub header_csv: PathBuf,

    /// Invoice items CSV.
    #[serde(default = "default_items_csv")]
    pub items_csv: PathBuf,

    /// Field delimiter of both files.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            header_csv: default_header_csv(),
            items_csv: default_items_csv(),
            delimiter: default_delimiter(),
        }
    }
}

fn default_header_csv() -> PathBuf {
    PathBuf::from("data/202401_NF_header.csv")
}

fn default_items_csv() -> PathBuf {
    PathBuf::from("data/202401_NF_items.csv")
}

fn default_delimiter() -> char {
    ','
}

impl DataConfig {
    /// Delimiter as the byte the CSV reader expects.
    pub fn delimiter_byte(&self) -> Result<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(|b| b.is_ascii())
            .with_context(|| format!("Delimiter must be an ASCII character: {:?}", self.delimiter))
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(timeout) = args.timeout {
            self.model.timeout_seconds = timeout;
        }
        if args.no_llm {
            self.model.enabled = false;
        }

        if let Some(ref header) = args.header {
            self.data.header_csv = header.clone();
        }
        if let Some(ref items) = args.items {
            self.data.items_csv = items.clone();
        }
        if let Some(delimiter) = args.delimiter {
            self.data.delimiter = delimiter;
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
