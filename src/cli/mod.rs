//! CLI module for formrepl
//!
//! Provides command-line interface for:
//! - replicate: Register a callback, list every form, stream forms to stdout
//! - check-digest: Validate a digest string

mod args;
mod commands;
mod config;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{check_digest, replicate, run, run_command};
pub use config::{ListenConfig, ReplicatorConfig};
pub use errors::{CliError, CliErrorCode, CliResult};
pub use io::write_form;
