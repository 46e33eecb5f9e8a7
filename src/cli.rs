//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation.

use clap::Parser;
use std::path::PathBuf;

/// nfchat - ask questions about electronic invoice (NF-e) data
///
/// Joins an invoice header CSV with an items CSV on CHAVE_ACESSO and
/// answers questions in Portuguese. Rankings and totals are computed
/// locally; a local Ollama model optionally rephrases open questions.
///
/// Examples:
///   nfchat
///   nfchat --header data/header.csv --items data/items.csv
///   nfchat --query "Qual o valor total das notas fiscais?"
///   nfchat --no-llm --model llama3
///   nfchat --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Invoice header CSV (one row per invoice)
    #[arg(long, value_name = "FILE")]
    pub header: Option<PathBuf>,

    /// Invoice items CSV (one row per invoice line)
    #[arg(long, value_name = "FILE")]
    pub items: Option<PathBuf>,

    /// CSV field delimiter
    #[arg(long, value_name = "CHAR")]
    pub delimiter: Option<char>,

    /// Ollama model used to rephrase answers
    #[arg(short, long, env = "NFCHAT_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Generation timeout in seconds
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .nfchat.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Answer a single question and exit
    #[arg(long, value_name = "TEXT")]
    pub query: Option<String>,

    /// Never call the language model
    #[arg(long)]
    pub no_llm: bool,

    /// Generate a default .nfchat.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(ref query) = self.query {
            if query.trim().is_empty() {
                return Err("Query must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on flags and the configured level.
    pub fn log_level(&self, configured: Option<&str>, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            configured
                .and_then(|level| level.parse().ok())
                .unwrap_or(tracing::Level::INFO)
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn make_args() -> Args {
        Args {
            header: None,
            items: None,
            delimiter: None,
            model: None,
            ollama_url: None,
            timeout: None,
            config: None,
            verbose: false,
            quiet: false,
            query: None,
            no_llm: false,
            init_config: false,
        }
    }

    #[test]
    fn test_validation_ok() {
        assert!(make_args().validate().is_ok());
    }

    #[test]
    fn test_validation_invalid_url() {
        let mut args = make_args();
        args.ollama_url = Some("localhost:11434".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_zero_timeout_and_empty_query() {
        let mut args = make_args();
        args.timeout = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.query = Some("  ".to_string());
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(None, false), tracing::Level::INFO);
        assert_eq!(args.log_level(Some("warn"), false), tracing::Level::WARN);
        assert_eq!(args.log_level(Some("bogus"), false), tracing::Level::INFO);
        assert_eq!(args.log_level(None, true), tracing::Level::DEBUG);

        args.verbose = true;
        assert_eq!(args.log_level(None, false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(Some("debug"), true), tracing::Level::ERROR);
    }

    #[test]
    fn test_parse_from_cli() {
        let args = Args::try_parse_from([
            "nfchat",
            "--header",
            "h.csv",
            "--items",
            "i.csv",
            "--delimiter",
            ";",
            "--query",
            "resumo",
            "--no-llm",
        ])
        .unwrap();
        assert_eq!(args.header, Some(PathBuf::from("h.csv")));
        assert_eq!(args.delimiter, Some(';'));
        assert_eq!(args.query.as_deref(), Some("resumo"));
        assert!(args.no_llm);
    }
}
