//! nfchat - question answering over electronic invoice (NF-e) data
//!
//! A CLI tool that joins invoice header and item CSV files, answers
//! questions with deterministic aggregations and optionally rephrases
//! the answers with a local Ollama model.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Startup error (bad arguments, config or data files) or unusable stdout

mod analysis;
mod chat;
mod cli;
mod config;
mod dataset;
mod llm;
mod models;
mod report;

use anyhow::{Context, Result};
use chat::ChatSession;
use cli::Args;
use config::{Config, CONFIG_FILE};
use llm::{GenerationBackend, OllamaBackend, ResponseComposer};
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    let mut config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };
    config.merge_with_args(&args);

    init_logging(&args, &config);

    info!("nfchat v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args, config).await {
        error!("nfchat failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .nfchat.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to customize data files, model and timeouts.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config: &Config) {
    let level = args.log_level(config.general.log_level.as_deref(), config.general.verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Warning: a tracing subscriber was already installed");
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    if let Some(ref config_path) = args.config {
        return Config::load(config_path);
    }

    Ok(Config::load_default()?.unwrap_or_default())
}

/// Load the data, wire the session and run it.
async fn run(args: Args, config: Config) -> Result<()> {
    if args.query.is_none() {
        println!("🚀 Inicializando Sistema de Chat para Notas Fiscais...");
    }

    let delimiter = config.data.delimiter_byte()?;
    let dataset = dataset::load_dataset(&config.data.header_csv, &config.data.items_csv, delimiter)
        .with_context(|| {
            format!(
                "Make sure the CSV files exist: {} and {}",
                config.data.header_csv.display(),
                config.data.items_csv.display()
            )
        })?;

    if dataset.is_empty() {
        warn!("The join produced no records; answers will be empty");
    }

    let interactive = args.query.is_none();
    if interactive {
        println!("=== Sistema de Chat - Análise de Notas Fiscais ===");
    }

    let composer = if config.model.enabled {
        let backend = OllamaBackend::new(
            &config.model.ollama_url,
            &config.model.name,
            config.model.timeout_seconds,
            config.model.health_timeout_seconds,
        )?;
        if interactive {
            check_backend(&backend).await;
        }
        ResponseComposer::new(Box::new(backend)).with_progress(interactive && !args.quiet)
    } else {
        info!("Language model disabled; answering with analyses only");
        ResponseComposer::offline()
    };

    let session = ChatSession::new(dataset, composer);
    info!(
        "Ready: {} records, {} columns",
        session.dataset().len(),
        session.dataset().columns().len()
    );

    match args.query {
        Some(ref query) => {
            println!("{}", session.ask(query).await);
            Ok(())
        }
        None => session.run_interactive().await,
    }
}

/// Report whether Ollama is reachable. Never fatal.
async fn check_backend(backend: &OllamaBackend) {
    println!("Testando conexão com Ollama...");
    match backend.list_models().await {
        Ok(models) => {
            println!("✅ Ollama conectado! Modelos disponíveis: {:?}", models);
        }
        Err(e) => {
            warn!("Ollama health check failed: {}", e);
            println!("❌ Não foi possível conectar ao Ollama");
            println!("💡 Certifique-se de que o Ollama está rodando: ollama serve");
            println!("⚠️  Ollama não disponível - funcionará apenas com análises básicas");
        }
    }
}
