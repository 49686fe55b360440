//! Command-line interface for model-bridge.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Run the bundled ONNX model from the command line.
#[derive(Parser, Debug)]
#[command(name = "model-bridge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a YAML config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). Overrides the config.
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one forward pass on an input file.
    Infer {
        /// JSON input: a flat numeric array or `{ "data": [...] }`.
        #[arg(short, long)]
        input: PathBuf,

        /// Output format (json, pretty).
        #[arg(short, long, default_value = "json")]
        format: String,
    },

    /// Dispatch a JSON method call and print the response.
    Call {
        /// JSON file holding `{ "method": ..., "arguments": { ... } }`.
        #[arg(short, long)]
        request: PathBuf,
    },

    /// Show configuration and check that the model loads.
    Info,
}

impl Cli {
    /// Parse command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
