//! # Book Genre CLI (`genre`)
//!
//! ## Usage
//!
//! ```bash
//! genre --config ./config/genre.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `genre serve` | Start the upload page and REST API |
//! | `genre classify <file>` | Classify one PDF and print the result as JSON |
//! | `genre labels` | Print the native → final label mapping |

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use book_genre::classifier::shared_classifier;
use book_genre::config::{self, Config};
use book_genre::labels::print_label_table;
use book_genre::models::{DocumentPayload, PredictResponse};
use book_genre::pipeline::classify_document;
use book_genre::server;

/// Book genre classification: fiction, non-fiction or other.
#[derive(Parser)]
#[command(name = "genre", version, about = "Classify PDF documents as Fiction, Non-Fiction or Other")]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/genre.toml`. `classify` and `labels` fall back to
    /// built-in defaults when the file does not exist.
    #[arg(long, global = true, default_value = "./config/genre.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (upload page, `/upload`, `/predict`, `/health`).
    Serve,

    /// Classify a single PDF and print the prediction as JSON.
    ///
    /// The model is only loaded once the document has yielded text.
    Classify {
        /// Path to the PDF file.
        file: PathBuf,
    },

    /// Print how each native genre label maps to the final label.
    Labels,
}

/// Load the config, or the defaults if the file is absent.
fn load_or_default(path: &Path) -> anyhow::Result<Config> {
    if path.exists() {
        config::load_config(path)
    } else {
        Ok(Config::default())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("book_genre=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Labels => {
            load_or_default(&cli.config)?;
            print_label_table();
        }
        Commands::Classify { file } => {
            let cfg = load_or_default(&cli.config)?;
            run_classify(&cfg, &file).await?;
        }
        Commands::Serve => {
            let cfg = config::load_config(&cli.config)?;
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}

async fn run_classify(cfg: &Config, file: &Path) -> anyhow::Result<()> {
    let bytes = tokio::fs::read(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let payload = DocumentPayload::new(
        file.display().to_string(),
        chrono::Utc::now().timestamp() as f64,
        bytes,
    );

    let classifier = Arc::new(shared_classifier(&cfg.model));
    let handle = classifier.clone();
    let result = tokio::task::spawn_blocking(move || classify_document(&payload, &*handle))
        .await?
        .with_context(|| format!("Failed to classify {}", file.display()))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&PredictResponse::from(&result))?
    );
    classifier.release();
    Ok(())
}
