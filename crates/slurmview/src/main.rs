//! slurmview - live SLURM cluster telemetry over a persistent SSH session.

mod cli;
mod fetcher;
mod polling;

use clap::Parser;
use cli::Args;
use fetcher::SlurmFetcher;
use miette::{IntoDiagnostic, Result};
use polling::PollDriver;
use slurmview_ssh::{SshConfig, SshError, SshSession};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let session = Arc::new(SshSession::new(SshConfig::new(&args.host, &args.user)));

    // Log every connection state transition
    let mut status_rx = session.subscribe();
    tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = *status_rx.borrow_and_update();
            tracing::info!(?status, "connection status");
        }
    });

    match session.connect().await {
        Err(e @ SshError::NoCredentialFound(_)) => return Err(e).into_diagnostic(),
        Err(e) => tracing::error!(error = %e, "initial connection failed, will retry"),
        Ok(()) => {}
    }

    let fetcher = SlurmFetcher::new(Arc::clone(&session), args.user.clone());
    let (driver, handle) = PollDriver::new(
        Arc::clone(&session),
        fetcher,
        Duration::from_secs(args.poll_interval),
    );
    let driver_task = driver.start();

    let mut snapshots = handle.snapshots();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if let Some(s) = snapshot {
                    tracing::info!(
                        jobs = s.jobs.len(),
                        nodes = s.node_summary.total_nodes,
                        allocated_cpus = s.node_summary.allocated_cpus,
                        fair_share = s.fair_share.fair_share_factor,
                        "snapshot updated"
                    );
                }
            }
        }
    }

    drop(handle);
    driver_task.abort();
    session.dispose().await;
    Ok(())
}
