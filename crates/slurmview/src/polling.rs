//! Fixed-interval poll driver publishing snapshots outward.

use crate::fetcher::{DEFAULT_TAIL_LINES, SlurmFetcher};
use slurmview_slurm::Snapshot;
use slurmview_ssh::{SshError, SshSession};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Control inputs accepted from the consumer.
pub enum PollCommand {
    /// Fetch a fresh snapshot now
    Refresh,
    /// Tail a remote file
    TailLog {
        path: String,
        lines: u32,
        reply: oneshot::Sender<Result<String, SshError>>,
    },
    /// Stop interval-triggered fetches (consumer not visible)
    Pause,
    /// Fetch immediately and restart the interval
    Resume,
}

/// Outward interface of the driver: snapshot stream plus control inputs.
///
/// Dropping every handle shuts the driver down.
#[derive(Clone)]
pub struct PollHandle {
    commands: mpsc::Sender<PollCommand>,
    snapshots: watch::Receiver<Option<Arc<Snapshot>>>,
}

impl PollHandle {
    /// Snapshot stream; holds `None` until the first successful fetch.
    pub fn snapshots(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.snapshots.clone()
    }

    pub async fn refresh(&self) -> bool {
        self.commands.send(PollCommand::Refresh).await.is_ok()
    }

    pub async fn pause(&self) -> bool {
        self.commands.send(PollCommand::Pause).await.is_ok()
    }

    pub async fn resume(&self) -> bool {
        self.commands.send(PollCommand::Resume).await.is_ok()
    }

    /// Tail a remote file through the driver's session.
    pub async fn tail_log(&self, path: &str, lines: Option<u32>) -> Result<String, SshError> {
        let (reply, response) = oneshot::channel();
        let cmd = PollCommand::TailLog {
            path: path.to_string(),
            lines: lines.unwrap_or(DEFAULT_TAIL_LINES),
            reply,
        };
        if self.commands.send(cmd).await.is_err() {
            return Err(SshError::Transport("poll driver stopped".to_string()));
        }
        response
            .await
            .unwrap_or_else(|_| Err(SshError::Transport("poll driver stopped".to_string())))
    }
}

/// Drives the fetch cycle on a fixed interval.
///
/// Cycles never overlap: each fetch is awaited inline in the single loop
/// before the next tick is considered. On any fetch failure the driver's
/// sole recovery is one awaited reconnect attempt, whose own failure is
/// swallowed (the session's internal loop keeps retrying).
pub struct PollDriver {
    session: Arc<SshSession>,
    fetcher: SlurmFetcher,
    poll_interval: Duration,
    snapshot_tx: watch::Sender<Option<Arc<Snapshot>>>,
    commands: mpsc::Receiver<PollCommand>,
}

impl PollDriver {
    pub fn new(
        session: Arc<SshSession>,
        fetcher: SlurmFetcher,
        poll_interval: Duration,
    ) -> (Self, PollHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(16);
        let (snapshot_tx, snapshot_rx) = watch::channel(None);
        let driver = Self {
            session,
            fetcher,
            poll_interval,
            snapshot_tx,
            commands: cmd_rx,
        };
        let handle = PollHandle {
            commands: cmd_tx,
            snapshots: snapshot_rx,
        };
        (driver, handle)
    }

    /// Start the driver in the background.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let Self {
            session,
            fetcher,
            poll_interval,
            snapshot_tx,
            mut commands,
        } = self;

        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut paused = false;

        loop {
            tokio::select! {
                _ = ticker.tick(), if !paused => {
                    fetch_and_publish(&fetcher, &session, &snapshot_tx).await;
                }
                cmd = commands.recv() => {
                    match cmd {
                        None => break,
                        Some(PollCommand::Refresh) => {
                            fetch_and_publish(&fetcher, &session, &snapshot_tx).await;
                        }
                        Some(PollCommand::Pause) => paused = true,
                        Some(PollCommand::Resume) => {
                            if paused {
                                paused = false;
                                fetch_and_publish(&fetcher, &session, &snapshot_tx).await;
                                ticker.reset();
                            }
                        }
                        Some(PollCommand::TailLog { path, lines, reply }) => {
                            let _ = reply.send(fetcher.fetch_log_tail(&path, lines).await);
                        }
                    }
                }
            }
        }
        tracing::debug!("poll driver stopped");
    }
}

async fn fetch_and_publish(
    fetcher: &SlurmFetcher,
    session: &Arc<SshSession>,
    snapshot_tx: &watch::Sender<Option<Arc<Snapshot>>>,
) {
    match fetcher.fetch_all().await {
        Ok(snapshot) => {
            tracing::debug!(jobs = snapshot.jobs.len(), "snapshot fetched");
            snapshot_tx.send_replace(Some(Arc::new(snapshot)));
        }
        Err(e) => {
            tracing::warn!(error = %e, "fetch failed, attempting reconnect");
            if let Err(e) = session.connect().await {
                tracing::debug!(error = %e, "reconnect attempt failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::Utf8PathBuf;
    use slurmview_ssh::SshConfig;

    fn driver_pair() -> (PollDriver, PollHandle, tempfile::TempDir) {
        // Empty key directory: reconnect attempts after failed fetches
        // fail fast on credential lookup instead of spawning ssh
        let key_dir = tempfile::tempdir().unwrap();
        let mut config = SshConfig::new("example.invalid", "jsmith");
        config.key_dir = Some(Utf8PathBuf::from_path_buf(key_dir.path().to_path_buf()).unwrap());
        let session = Arc::new(SshSession::new(config));
        let fetcher = SlurmFetcher::new(Arc::clone(&session), "jsmith");
        // Long interval so only the immediate first tick fires during tests
        let (driver, handle) = PollDriver::new(session, fetcher, Duration::from_secs(3600));
        (driver, handle, key_dir)
    }

    #[tokio::test]
    async fn test_driver_exits_when_handles_dropped() {
        let (driver, handle, _keys) = driver_pair();
        let task = driver.start();
        drop(handle);
        tokio::time::timeout(Duration::from_secs(30), task)
            .await
            .expect("driver should stop once all handles are gone")
            .unwrap();
    }

    #[tokio::test]
    async fn test_tail_log_propagates_session_error() {
        let (driver, handle, _keys) = driver_pair();
        let _task = driver.start();
        let err = handle.tail_log("/tmp/missing.log", None).await.unwrap_err();
        // The session never connected, so the tail must fail fast
        assert!(matches!(
            err,
            SshError::NotConnected | SshError::Transport(_)
        ));
    }

    #[tokio::test]
    async fn test_pause_and_resume_accepted() {
        let (driver, handle, _keys) = driver_pair();
        let _task = driver.start();
        assert!(handle.pause().await);
        assert!(handle.resume().await);
        assert!(handle.snapshots().borrow().is_none());
    }

    #[tokio::test]
    async fn test_no_snapshot_published_before_first_success() {
        let (driver, handle, _keys) = driver_pair();
        let _task = driver.start();
        assert!(handle.refresh().await);
        assert!(handle.snapshots().borrow().is_none());
    }
}
