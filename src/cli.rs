// src/cli.rs
//! CLI definitions for extconv
//!
//! This module contains all command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "extconv")]
#[command(author = "extconv Contributors")]
#[command(version)]
#[command(about = "Convert browser extensions between Chrome (.crx) and Firefox (.xpi)", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: <config dir>/extconv/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the history file (default: <data dir>/extconv/history.json)
    #[arg(long, global = true)]
    pub history_file: Option<PathBuf>,

    /// Only print errors and results
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert a .crx into a .xpi, or a .xpi into a .crx
    Convert {
        /// Path to the extension package
        input: PathBuf,

        /// Directory for the converted package (default: next to the input)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Override the maximum input size in bytes
        #[arg(long)]
        max_size: Option<u64>,

        /// Do not record this conversion in the history file
        #[arg(long)]
        no_history: bool,
    },

    /// Show what an extension package contains
    Inspect {
        /// Path to the extension package
        input: PathBuf,
    },

    /// Conversion history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand)]
pub enum HistoryCommands {
    /// List recorded conversions, newest first
    List {
        /// Show at most this many entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Remove one entry by id (or unique id prefix)
    Remove {
        /// Entry id or prefix
        id: String,
    },

    /// Remove all entries
    Clear,
}
