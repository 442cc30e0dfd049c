//! # Synapse CLI (`synapse`)
//!
//! Command-line interface for the Synapse study engine: upload lecture
//! notes, PDFs, and recordings, watch them move through the ingestion
//! pipeline, and ask grounded questions about them.
//!
//! ```bash
//! # Initialize the database
//! synapse init --config ./config/synapse.toml
//!
//! # Ingest a document
//! synapse ingest notes.pdf --title "Thermodynamics II"
//!
//! # Check processing state
//! synapse status <id>
//!
//! # Ask a question, with audio timestamps resolved to citations
//! synapse ask <id> "when is entropy introduced?" --timestamps
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use synapse::{ask, config, db, get, migrate, status, upload};

/// Synapse — an AI-assisted study engine over your own documents.
///
/// All commands accept a `--config` flag pointing to a TOML
/// configuration file. See `config/synapse.example.toml`.
#[derive(Parser)]
#[command(
    name = "synapse",
    about = "Synapse — ingest study material and ask grounded questions about it",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/synapse.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables
    /// (documents, chunks, chat_sessions, chat_messages). Idempotent.
    Init,

    /// Upload a file and run the full ingestion pipeline.
    ///
    /// Supported formats: PDF, markdown, plain text, and audio
    /// (mp3, wav, m4a, ogg, flac — transcribed via Deepgram).
    Ingest {
        /// Path to the file to ingest.
        file: PathBuf,

        /// Document title; defaults to the file name.
        #[arg(long)]
        title: Option<String>,
    },

    /// Show ingestion status.
    ///
    /// With an id, prints that document's full state including any
    /// failure message; without one, lists every document.
    Status {
        /// Document UUID.
        id: Option<String>,
    },

    /// Print a document's extracted content.
    Get {
        /// Document UUID.
        id: String,

        /// Also list the document's chunks with their offsets.
        #[arg(long)]
        chunks: bool,
    },

    /// Ask a question about a document.
    ///
    /// Retrieves the most relevant chunks, asks the completion model a
    /// grounded question, and continues the document's latest chat
    /// session unless `--session` picks one explicitly.
    Ask {
        /// Document UUID.
        id: String,

        /// The question.
        question: String,

        /// Continue a specific chat session.
        #[arg(long)]
        session: Option<String>,

        /// Tutor personality (see `synapse personalities`).
        #[arg(long)]
        personality: Option<String>,

        /// Label audio chunks with time ranges and resolve inline
        /// timestamp markers into audio references.
        #[arg(long)]
        timestamps: bool,

        /// Print the retrieved chunks and their similarity scores.
        #[arg(long)]
        sources: bool,
    },

    /// List the built-in tutor personalities.
    Personalities,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Personalities = cli.command {
        ask::run_personalities();
        return Ok(());
    }

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            let pool = db::connect(&cfg.db.path).await?;
            migrate::run_migrations(&pool).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { file, title } => {
            upload::run_ingest(&cfg, &file, title).await?;
        }
        Commands::Status { id } => {
            status::run_status(&cfg, id.as_deref()).await?;
        }
        Commands::Get { id, chunks } => {
            get::run_get(&cfg, &id, chunks).await?;
        }
        Commands::Ask {
            id,
            question,
            session,
            personality,
            timestamps,
            sources,
        } => {
            ask::run_ask(
                &cfg,
                &id,
                &question,
                session.as_deref(),
                personality.as_deref(),
                timestamps,
                sources,
            )
            .await?;
        }
        Commands::Personalities => unreachable!(),
    }

    Ok(())
}
