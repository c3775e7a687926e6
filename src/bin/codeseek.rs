//! `codeseek` command-line entry point.
//!
//! Runs one search and prints the response as pretty JSON on stdout. All
//! tracing output goes to stderr so stdout stays machine-readable.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use codeseek::{App, AppConfig};

#[derive(Debug, Parser)]
#[command(name = "codeseek", version, about = "Search developer Q&A sources")]
struct Cli {
    /// Config file (defaults to ~/.config/codeseek/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run a search and print the ranked response
    Search {
        /// Query text
        query: String,
        /// Number of ranked results
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Results to skip
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset: i64,
        /// Sort mode: relevance or new
        #[arg(long, default_value = "relevance")]
        sort: String,
        /// Comma-separated tag filter
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
    },
    /// Write the default configuration file
    InitConfig,
}

fn init_tracing(default_level: &str) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .or_else(|_| tracing_subscriber::EnvFilter::try_new(default_level))
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let path = cli.config.unwrap_or_else(AppConfig::default_config_path);

    let mut config = AppConfig::load_or_default(&path)?;
    init_tracing(&config.logging.level);

    match cli.command {
        Command::InitConfig => {
            config.save_to_file(&path)?;
            tracing::info!(path = %path.display(), "config written");
        }
        Command::Search {
            query,
            limit,
            offset,
            sort,
            tags,
        } => {
            config.apply_env();
            let app = App::bootstrap(&config)?;

            let response = app.search(&query, limit, offset, &sort, &tags).await;
            println!("{}", serde_json::to_string_pretty(&response)?);

            app.shutdown().await;
            let summary = app.analytics().await?;
            tracing::debug!(
                total_queries = summary.total_queries,
                total_documents = summary.total_documents,
                "analytics"
            );
        }
    }

    Ok(())
}
