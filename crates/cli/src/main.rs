//! Optimus CLI: the main entry point.
//!
//! Commands:
//! - `serve`  : Start the HTTP API
//! - `ask`    : Run one query through the agent
//! - `ingest` : Index a text document for retrieval
//! - `search` : Query the document index
//! - `calc`   : Evaluate an arithmetic expression
//! - `config` : Validate, show or locate the configuration

use clap::{Parser, Subcommand};

mod commands;
mod runtime;

#[derive(Parser)]
#[command(
    name = "optimus",
    about = "Optimus: operations assistant with tools, retrieval and streaming",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true, env = "OPTIMUS_LOG_JSON")]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Override the port
        #[arg(short, long)]
        port: Option<u16>,

        /// Override the bind address
        #[arg(long)]
        host: Option<String>,
    },

    /// Ask the agent a single question
    Ask {
        query: String,

        /// Model provider (openai, google)
        #[arg(long)]
        provider: Option<String>,

        /// Model name
        #[arg(short, long)]
        model: Option<String>,

        /// Print step frames as they arrive
        #[arg(short, long)]
        stream: bool,
    },

    /// Index a text file into the document store
    Ingest { path: std::path::PathBuf },

    /// Search indexed documents
    Search {
        query: String,

        /// Number of chunks to return (1-20)
        #[arg(short = 'k', long, default_value_t = 5)]
        top_k: i64,
    },

    /// Evaluate an arithmetic expression
    Calc { expression: String },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Load and validate the configuration
    Validate,
    /// Print the effective configuration with secrets redacted
    Show,
    /// Print the configuration file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    if cli.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }

    match cli.command {
        Commands::Serve { port, host } => commands::serve::run(port, host).await?,
        Commands::Ask {
            query,
            provider,
            model,
            stream,
        } => commands::ask::run(query, provider, model, stream).await?,
        Commands::Ingest { path } => commands::ingest::run(path).await?,
        Commands::Search { query, top_k } => commands::search::run(query, top_k).await?,
        Commands::Calc { expression } => commands::calc::run(&expression)?,
        Commands::Config { action } => match action {
            ConfigAction::Validate => commands::config_cmd::validate().await?,
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
    }

    Ok(())
}
