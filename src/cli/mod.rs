//! CLI module for Oppsum.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Oppsum - Media Transcript Summarization
///
/// A CLI tool that plans and runs a summarization pipeline over media
/// transcripts. The name "Oppsum" comes from the Norwegian word
/// "oppsummering," meaning "summary."
#[derive(Parser, Debug)]
#[command(name = "oppsum")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Summarize a media resource and extract its keywords
    Summarize {
        /// Resource URL or bare id
        locator: String,

        /// Summary mode (comprehensive, brief, key-points)
        #[arg(short, long)]
        mode: Option<String>,

        /// Write the structured result to a JSON file
        #[arg(short, long)]
        output: Option<String>,

        /// Look up where each extracted keyword is first discussed
        #[arg(short, long)]
        timestamps: bool,

        /// Export the session memory log to a JSON file
        #[arg(long)]
        export_memory: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Open configuration file in editor
    Edit,

    /// Show configuration file path
    Path,
}
