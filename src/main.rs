//! # Corpus Chat CLI (`cchat`)
//!
//! The `cchat` binary is the primary interface for Corpus Chat. It provides
//! commands for starting the WebSocket chat server, answering one-off
//! questions in the terminal, and inspecting the scraped corpus.
//!
//! ## Usage
//!
//! ```bash
//! cchat --config ./config/cchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `cchat serve` | Build the pipeline and start the WebSocket chat server |
//! | `cchat ask "<question>"` | Answer a single question and print the evidence |
//! | `cchat corpus` | Print corpus, chunk, and per-source statistics |
//!
//! `serve` and `ask` call the Gemini API and require the `GOOGLE_API_KEY`
//! environment variable, read from the process environment or a local
//! `.env` file.
//!
//! ## Examples
//!
//! ```bash
//! # Inspect the scraped corpus (no API key required)
//! cchat corpus --config ./config/cchat.toml
//!
//! # Answer a question without starting the server
//! cchat ask "What services do you offer?" --config ./config/cchat.toml
//!
//! # Start the WebSocket chat server
//! cchat serve --config ./config/cchat.toml
//! ```

mod ask;
mod chunk;
mod config;
mod corpus;
mod embedding;
mod error;
mod expand;
mod index;
mod llm;
mod models;
mod pipeline;
mod retrieve;
mod server;
mod session;
mod stats;
mod synthesis;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

/// Corpus Chat CLI — a retrieval-backed chat assistant for a scraped
/// website corpus.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/cchat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "cchat",
    about = "Corpus Chat — a retrieval-backed chat assistant for a scraped website corpus",
    version,
    long_about = "Corpus Chat loads a scraped website corpus, chunks and embeds it into an \
    in-memory vector index, and answers questions about the organization over a WebSocket \
    chat endpoint using multi-query retrieval and grounded synthesis."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/cchat.toml`. All corpus, chunking, retrieval,
    /// model, and server settings are read from this file.
    #[arg(long, global = true, default_value = "./config/cchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Start the WebSocket chat server.
    ///
    /// Loads the scraped corpus, chunks and embeds it, then binds to the
    /// address configured in `[server].bind` and serves the chat WebSocket
    /// at `/ws`. Initialization failure is fatal: the process exits non-zero
    /// rather than serving without an index.
    Serve,

    /// Answer a single question in the terminal.
    ///
    /// Runs the full pipeline (query expansion, vector search, grounded
    /// synthesis) for one question and prints the answer together with the
    /// evidence sources that backed it.
    Ask {
        /// The question to answer.
        question: String,
    },

    /// Show corpus statistics.
    ///
    /// Loads and chunks the corpus without calling any external API and
    /// prints document counts, chunk counts, and a per-source breakdown.
    Corpus,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up GOOGLE_API_KEY and friends from a local .env, if present.
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            let pipeline = pipeline::Pipeline::build(&cfg)
                .await
                .context("chatbot initialization failed")?;
            let summary = pipeline.summary();
            tracing::info!(
                documents = summary.documents,
                chunks = summary.chunks,
                embed_model = %summary.embed_model,
                chat_model = %summary.chat_model,
                "chatbot ready"
            );
            let state = server::AppState {
                pipeline: Some(Arc::new(pipeline)),
            };
            server::run_server(&cfg, state).await?;
        }
        Commands::Ask { question } => {
            ask::run_ask(&cfg, &question).await?;
        }
        Commands::Corpus => {
            stats::run_corpus_stats(&cfg)?;
        }
    }

    Ok(())
}

/// Log to stderr so `ask` and `corpus` output stays clean on stdout.
fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
