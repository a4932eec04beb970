//! CLI module for docqa
//!
//! Provides command-line interface parsing for the docqa binary.
//! Uses clap for argument parsing and owo-colors for colored terminal output.

pub mod output;

use crate::utils::toml_config::DocqaConfig;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};

/// docqa - grounded question answering over a single document
///
/// Answers come only from retrieved passages of the document, with
/// verifiable `[pX:cY]` citations, or the canonical refusal.
#[derive(Parser, Debug)]
#[command(
    name = "docqa",
    version,
    about = "Grounded, citation-checked question answering over a document",
    after_help = "EXAMPLES:\n    \
                  docqa chat report.txt                       # Interactive session\n    \
                  docqa ask report.txt \"What was Q4 revenue?\" # One question\n    \
                  docqa index pages.json --chunk-size 1500    # Build and cache the index\n    \
                  docqa --config my.toml chat report.txt      # Use a custom config file"
)]
pub struct Cli {
    /// Path to the configuration file (defaults to ./docqa.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Show retrieval tables and validation diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask questions interactively
    Chat {
        /// Document to load (.txt with form-feed pages, or page-tagged .json)
        document: PathBuf,

        #[command(flatten)]
        index: IndexArgs,
    },

    /// Ask a single question and exit
    Ask {
        /// Document to load
        document: PathBuf,

        /// The question
        question: String,

        #[command(flatten)]
        index: IndexArgs,
    },

    /// Build (or refresh) the cached index without asking anything
    Index {
        /// Document to load
        document: PathBuf,

        #[command(flatten)]
        index: IndexArgs,
    },
}

/// Overrides shared by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct IndexArgs {
    /// Passages retrieved per question
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Passage length in characters
    #[arg(long)]
    pub chunk_size: Option<usize>,

    /// Characters shared by consecutive passages
    #[arg(long)]
    pub chunk_overlap: Option<usize>,

    /// Ignore and do not write the index cache
    #[arg(long)]
    pub no_cache: bool,
}

impl IndexArgs {
    /// Apply these flags on top of file configuration.
    pub fn apply(&self, config: &mut DocqaConfig) {
        if let Some(top_k) = self.top_k {
            config.retrieval.top_k = top_k;
        }
        if let Some(size) = self.chunk_size {
            config.chunking.chunk_size = size;
        }
        if let Some(overlap) = self.chunk_overlap {
            config.chunking.chunk_overlap = overlap;
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
    }
}

impl Commands {
    pub fn document(&self) -> &Path {
        match self {
            Commands::Chat { document, .. }
            | Commands::Ask { document, .. }
            | Commands::Index { document, .. } => document,
        }
    }

    pub fn index_args(&self) -> &IndexArgs {
        match self {
            Commands::Chat { index, .. }
            | Commands::Ask { index, .. }
            | Commands::Index { index, .. } => index,
        }
    }
}

impl Cli {
    /// Parse CLI arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Apply global and subcommand flags on top of file configuration.
    pub fn apply(&self, config: &mut DocqaConfig) {
        if self.json_logs {
            config.logging.json = true;
        }
        self.command.index_args().apply(config);
    }
}
