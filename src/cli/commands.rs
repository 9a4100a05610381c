//! CLI command implementations
//!
//! `replicate` wires a [`Replicator`] to a local callback server and acts
//! as the consumer: every replicated form is written to stdout, everything
//! else goes to the log.

use std::path::PathBuf;

use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::http_server::HttpServer;
use crate::observability::{log_event_with_fields, Event, Logger, Severity};
use crate::replication::{
    is_digest, Action, EventReceiver, ReplicationEvent, Replicator,
};

use super::args::Command;
use super::config::ReplicatorConfig;
use super::errors::{CliError, CliResult};
use super::io::write_form;

/// Parse arguments and run the selected command
pub fn run() -> CliResult<()> {
    let cli = super::args::Cli::parse_args();
    run_command(cli.command)
}

/// Run the appropriate command based on CLI args
pub fn run_command(cmd: Command) -> CliResult<()> {
    match cmd {
        Command::Replicate {
            config,
            form_server,
            callback_endpoint,
            listen_port,
            log_level,
        } => {
            let severity = Severity::parse(&log_level)
                .ok_or_else(|| CliError::config_error(format!("Unknown log level: {}", log_level)))?;
            Logger::set_min_severity(severity);

            let config = load_config(config, form_server, callback_endpoint, listen_port)?;
            replicate(config)
        }
        Command::CheckDigest { digest } => check_digest(&digest),
    }
}

fn load_config(
    path: Option<PathBuf>,
    form_server: Option<String>,
    callback_endpoint: Option<String>,
    listen_port: Option<u16>,
) -> CliResult<ReplicatorConfig> {
    let base = match &path {
        Some(path) => {
            let config = ReplicatorConfig::load(path)?;
            log_event_with_fields(Event::ConfigLoaded, &[("path", &*path.to_string_lossy())]);
            config
        }
        None => ReplicatorConfig::default(),
    };

    let config = base.with_overrides(form_server, callback_endpoint, listen_port);
    config.validate()?;
    Ok(config)
}

/// Validate a digest given on the command line
pub fn check_digest(candidate: &str) -> CliResult<()> {
    if is_digest(candidate) {
        Ok(())
    } else {
        Err(CliError::invalid_digest(candidate))
    }
}

/// Replicate until Ctrl-C or until the session is lost
pub fn replicate(config: ReplicatorConfig) -> CliResult<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(replicate_async(config))
}

async fn replicate_async(config: ReplicatorConfig) -> CliResult<()> {
    let (replicator, events) = Replicator::new();

    // The callback route must be reachable before registration, or the
    // first callbacks would be refused.
    let server_config = config.http_server_config();
    let listener = TcpListener::bind(server_config.socket_addr()).await?;
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = HttpServer::with_config(replicator.clone(), server_config);
    let server_task = tokio::spawn(server.serve(listener, async move {
        let _ = shutdown_rx.await;
    }));

    let outcome = match replicator
        .start(&config.form_server_url, &config.callback_endpoint)
        .await
    {
        Ok(()) => consume(events).await,
        Err(e) => Err(CliError::from(e)),
    };

    if !replicator.state().is_idle() {
        replicator.stop()?;
    }
    let _ = shutdown_tx.send(());
    match server_task.await {
        Ok(result) => result?,
        Err(e) => return Err(CliError::io_error(format!("callback server task failed: {}", e))),
    }

    outcome
}

/// Drain events until Ctrl-C or a listing failure
async fn consume(mut events: EventReceiver) -> CliResult<()> {
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => return Ok(()),
            event = events.recv() => {
                let Some(event) = event else {
                    return Ok(());
                };
                match event {
                    ReplicationEvent::Form { digest, form } => write_form(&digest, &form)?,
                    ReplicationEvent::Error(e) if e.action() == Some(Action::ListForms) => {
                        return Err(CliError::from(e));
                    }
                    ReplicationEvent::Error(e) => {
                        Logger::error("REPLICATION_ERROR", &[("error", e.to_string().as_str())]);
                    }
                    ReplicationEvent::Info(message) => {
                        Logger::info("REPLICATION_INFO", &[("message", message.as_str())]);
                    }
                    ReplicationEvent::Digest(_) | ReplicationEvent::Invalid(_) => {}
                }
            }
        }
    }
}
