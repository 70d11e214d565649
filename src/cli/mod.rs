//! CLI module for medrag
//!
//! Provides command-line interface parsing for the medrag-server binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// medrag - Retrieval-augmented medical question answering
#[derive(Parser, Debug)]
#[command(
    name = "medrag-server",
    version,
    about = "Retrieval-augmented medical chatbot server",
    long_about = "Answers medical questions from a Pinecone index of reference documents.\n\n\
                  Run without arguments to start the server, or use 'ingest' to index the\n\
                  PDFs in the data directory first.",
    after_help = "EXAMPLES:\n    \
                  medrag-server ingest                 # Index ./data into Pinecone\n    \
                  medrag-server ingest --data-dir docs # Index another directory\n    \
                  medrag-server                        # Start the server\n    \
                  medrag-server config --validate      # Check configuration and env vars"
)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "medrag.toml", global = true)]
    pub config: PathBuf,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute (defaults to `serve`)
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Start the HTTP server
    Serve,

    /// Load, chunk, embed and upsert documents into the index
    Ingest {
        /// Directory containing the source PDFs (defaults to rag.data_dir)
        #[arg(short, long)]
        data_dir: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config {
        /// Also check that required environment variables are set
        #[arg(long)]
        validate: bool,
    },
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
