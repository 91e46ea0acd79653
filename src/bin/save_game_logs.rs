//! # save-game-logs
//!
//! Persists game session logs posted by the web client.
//!
//! Runs as a CGI script by default: request metadata comes from the
//! environment, the body from stdin, and the response goes to stdout.
//! `save-game-logs serve` runs the same handler as a standalone HTTP server.

#![deny(unsafe_code)]

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arc_logsaver::cgi::{self, CgiEnv};
use arc_logsaver::{LogResponse, LogSaver, LogStore, SaveError, http};
use arc_settings::{ArcSettings, LogSaverSettings};
use arc_telemetry::TelemetryConfig;
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::{error, info, warn};

/// Game log saver.
#[derive(Parser, Debug)]
#[command(name = "save-game-logs", about = "Save posted game session logs as JSON files")]
struct Cli {
    /// Directory logs are written to.
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Serve over HTTP instead of answering one CGI request.
    Serve {
        /// Interface to bind.
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (0 for auto-assign).
        #[arg(long)]
        port: Option<u16>,

        /// Largest accepted request body in bytes.
        #[arg(long)]
        max_body_bytes: Option<usize>,
    },
}

impl Cli {
    /// Parse argv, except under a CGI host where argv may carry an
    /// isindex query instead of flags.
    fn from_process() -> Self {
        if std::env::var_os("GATEWAY_INTERFACE").is_some() {
            Self {
                log_dir: None,
                command: None,
            }
        } else {
            Self::parse()
        }
    }

    /// Flags take precedence over settings.
    fn apply(&self, settings: &mut LogSaverSettings) {
        if let Some(dir) = &self.log_dir {
            settings.log_dir.clone_from(dir);
        }
        if let Some(Command::Serve {
            host,
            port,
            max_body_bytes,
        }) = &self.command
        {
            if let Some(host) = host {
                settings.http_host.clone_from(host);
            }
            if let Some(port) = port {
                settings.http_port = *port;
            }
            if let Some(limit) = max_body_bytes {
                settings.max_body_bytes = *limit;
            }
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::from_process();
    let loaded = arc_telemetry::with_bootstrap_logging(arc_settings::load_settings);
    let telemetry = loaded
        .as_ref()
        .map(|settings| TelemetryConfig::from(&settings.logging))
        .unwrap_or_default();
    arc_telemetry::init_subscriber(&telemetry);

    if cli.command.is_none() {
        let env = CgiEnv::from_process_env();
        return answer_cgi(loaded, &cli, &env, io::stdin().lock(), io::stdout().lock())
            .context("failed to write CGI response");
    }

    let mut saver_settings = loaded.context("failed to load settings")?.log_saver;
    cli.apply(&mut saver_settings);
    let saver = LogSaver::new(LogStore::new(saver_settings.log_dir.clone()));
    tokio::runtime::Runtime::new()
        .context("failed to start tokio runtime")?
        .block_on(run_http(saver, &saver_settings))
}

/// Answer one CGI request. The web server still gets a JSON response when
/// the settings cannot be loaded.
fn answer_cgi<R: Read, W: Write>(
    settings: arc_settings::Result<ArcSettings>,
    cli: &Cli,
    env: &CgiEnv,
    stdin: R,
    stdout: W,
) -> io::Result<()> {
    match settings {
        Ok(settings) => {
            let mut saver_settings = settings.log_saver;
            cli.apply(&mut saver_settings);
            let saver = LogSaver::new(LogStore::new(saver_settings.log_dir));
            cgi::run(&saver, env, stdin, stdout)
        }
        Err(err) => {
            error!(error = %err, "failed to load settings");
            let err = SaveError::Unexpected(format!("failed to load settings: {err}"));
            cgi::write_response(&LogResponse::error(&err), stdout)
        }
    }
}

async fn run_http(saver: LogSaver, settings: &LogSaverSettings) -> Result<()> {
    let addr = format!("{}:{}", settings.http_host, settings.http_port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    http::serve(listener, Arc::new(saver), settings.max_body_bytes, async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to listen for ctrl+c");
        }
    })
    .await
    .context("log saver server failed")?;

    info!("shutdown complete");
    Ok(())
}
