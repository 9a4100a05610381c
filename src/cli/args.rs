//! CLI argument definitions using clap
//!
//! Commands:
//! - formrepl replicate [--config <path>] [--form-server <url>] ...
//! - formrepl check-digest <digest>

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// formrepl - Replicate forms from a remote form server
#[derive(Parser, Debug)]
#[command(name = "formrepl")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Replicate every form from a form server, writing each as a JSON line
    Replicate {
        /// Path to configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Form server URL, e.g. https://api.commonform.org
        #[arg(long)]
        form_server: Option<String>,

        /// URL the form server should POST new digests to
        #[arg(long)]
        callback_endpoint: Option<String>,

        /// Port for the local callback server
        #[arg(long)]
        listen_port: Option<u16>,

        /// Lowest log level written (trace, info, warn, error)
        #[arg(long, default_value = "info")]
        log_level: String,
    },

    /// Exit successfully if the argument is a well-formed digest
    CheckDigest {
        /// Candidate digest
        digest: String,
    },
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}
