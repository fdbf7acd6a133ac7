//! ora-beam: watch directories and upload the newest matching file to S3.
//!
//!   ora-beam <CONFIG>                 appends `-<hostname>` to uploaded names
//!   ora-beam <CONFIG> --plain-names   uploads under the original file name
//!
//! Logging goes to stderr; set `RUST_LOG` to change the filter.

use anyhow::{Context, Result};
use clap::Parser;
use ora_beam::config::Config;
use ora_beam::logging::init_logging;
use ora_beam::naming;
use ora_beam::upload::{S3Store, UploadQueue};
use ora_beam::watcher::{NotifySource, Supervisor};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

#[derive(Debug, Parser)]
#[command(name = "ora-beam", version, about)]
struct Cli {
    /// Path to the JSON rule document.
    config: PathBuf,

    /// Upload files under their original names instead of suffixing the hostname.
    #[arg(long)]
    plain_names: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;

    let source = Arc::new(NotifySource::new(Duration::from_millis(
        config.watch.debounce_ms,
    )));
    let store = Arc::new(S3Store::new(config.storage.clone()));
    let queue = UploadQueue::new(tokio::runtime::Handle::current(), config.watch.max_uploads);

    let supervisor = Arc::new(Supervisor::new(config.rules, source, store, queue));
    if !cli.plain_names {
        supervisor.set_naming_function(naming::host_suffix);
    }

    let runner = Arc::clone(&supervisor);
    let mut dispatch = tokio::task::spawn_blocking(move || runner.run());

    tokio::select! {
        result = &mut dispatch => {
            result.context("dispatch loop panicked")??;
        }
        signal = shutdown_signal() => {
            signal?;
            supervisor.close()?;
            dispatch.await.context("dispatch loop panicked")??;
        }
    }

    let pending = supervisor.in_flight();
    if pending > 0 {
        info!(pending, "waiting for in-flight uploads");
    }
    supervisor.drain().await;

    Ok(())
}

#[cfg(unix)]
async fn shutdown_signal() -> Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;
    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => result.context("failed to listen for ctrl-c")?,
        _ = hangup.recv() => {}
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(not(unix))]
async fn shutdown_signal() -> Result<()> {
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")
}
