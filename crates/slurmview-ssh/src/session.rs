//! Connection state machine over an OpenSSH control-master transport.

use crate::keys;
use camino::Utf8PathBuf;
use serde::Serialize;
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Interval between control-socket readiness probes during connect.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Error, Debug)]
pub enum SshError {
    #[error("no SSH private key found in {0}")]
    NoCredentialFound(Utf8PathBuf),
    #[error("connection to {0} timed out")]
    ConnectTimeout(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("SSH session not connected")]
    NotConnected,
    #[error("remote command failed (code {exit_code}): {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Connection status, observable via [`SshSession::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    Disconnected,
    Reconnecting,
    Connected,
}

/// Session parameters. Reconnection uses a fixed delay, not backoff.
#[derive(Debug, Clone)]
pub struct SshConfig {
    pub host: String,
    pub user: String,
    pub connect_timeout: Duration,
    pub keepalive_interval: Duration,
    pub reconnect_delay: Duration,
    /// Directory searched for private keys; `None` means `~/.ssh`.
    pub key_dir: Option<Utf8PathBuf>,
}

impl SshConfig {
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive_interval: DEFAULT_KEEPALIVE_INTERVAL,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            key_dir: None,
        }
    }
}

#[derive(Default)]
struct Tasks {
    /// Awaits master-process exit and triggers disconnect handling
    monitor: Option<JoinHandle<()>>,
    /// Pending fixed-delay reconnect timer; at most one at a time.
    /// The handle stays in this slot for the attempt's whole lifetime so
    /// that [`SshSession::dispose`] can abort an in-flight connect.
    reconnect: Option<JoinHandle<()>>,
    /// Set by dispose; no further reconnects are scheduled once true.
    /// A later explicit connect clears it.
    disposed: bool,
}

/// A single persistent SSH session to the cluster login node.
///
/// The transport is the system OpenSSH client in control-master mode: one
/// long-lived `ssh -M -N` process owns the connection and keep-alive
/// probes, and each [`exec`](Self::exec) multiplexes a command over its
/// control socket.
pub struct SshSession {
    config: SshConfig,
    control_path: Utf8PathBuf,
    state_tx: watch::Sender<ConnectionState>,
    tasks: Mutex<Tasks>,
    /// Serializes connect attempts; a late caller waits, then observes the
    /// winner's `Connected` state and returns without a second master.
    connect_gate: tokio::sync::Mutex<()>,
}

impl SshSession {
    pub fn new(config: SshConfig) -> Self {
        let control_path = control_path_for(&config);
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            config,
            control_path,
            state_tx,
            tasks: Mutex::new(Tasks::default()),
            connect_gate: tokio::sync::Mutex::new(()),
        }
    }

    /// Current connection state.
    pub fn status(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Observe state transitions. The channel only fires on distinct
    /// changes; repeated identical states are suppressed.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Open (or reopen) the session.
    ///
    /// A no-op while already `Connected`, so a caller reacting to a
    /// transient command failure cannot stack a second master onto a live
    /// control socket. Concurrent calls are serialized; the loser sees the
    /// winner's result.
    ///
    /// Fails with [`SshError::NoCredentialFound`] when no candidate key
    /// exists, [`SshError::ConnectTimeout`] when the master does not come
    /// up within the configured timeout, and [`SshError::Transport`] when
    /// it exits during setup. State passes through `Reconnecting` and
    /// lands on `Connected` or `Disconnected`.
    pub async fn connect(self: &Arc<Self>) -> Result<(), SshError> {
        let _gate = self.connect_gate.lock().await;
        if self.status() == ConnectionState::Connected {
            return Ok(());
        }
        self.tasks.lock().unwrap_or_else(|e| e.into_inner()).disposed = false;

        let key_dir = self
            .config
            .key_dir
            .clone()
            .unwrap_or_else(keys::default_key_dir);
        let key =
            keys::find_private_key_in(&key_dir).ok_or(SshError::NoCredentialFound(key_dir))?;

        self.set_state(ConnectionState::Reconnecting);

        let mut master = match self.master_command(&key).spawn() {
            Ok(child) => child,
            Err(e) => {
                self.set_state(ConnectionState::Disconnected);
                return Err(SshError::Io(e));
            }
        };

        let ready =
            tokio::time::timeout(self.config.connect_timeout, self.wait_ready(&mut master)).await;
        match ready {
            Err(_) => {
                let _ = master.start_kill();
                self.set_state(ConnectionState::Disconnected);
                Err(SshError::ConnectTimeout(self.config.host.clone()))
            }
            Ok(Err(e)) => {
                let _ = master.start_kill();
                self.set_state(ConnectionState::Disconnected);
                Err(e)
            }
            Ok(Ok(())) => {
                self.set_state(ConnectionState::Connected);
                self.watch_master(master);
                tracing::info!(host = %self.config.host, "SSH session established");
                Ok(())
            }
        }
    }

    /// Run a command on the remote host and return its stdout.
    ///
    /// Fails with [`SshError::NotConnected`] outside the `Connected` state,
    /// before any process is spawned. A non-zero exit only fails when the
    /// command also produced stderr text; silent non-zero exits are treated
    /// as success (some probes, like quota, exit non-zero benignly).
    pub async fn exec(&self, command: &str) -> Result<String, SshError> {
        if self.status() != ConnectionState::Connected {
            return Err(SshError::NotConnected);
        }

        let output = self
            .control_command()
            .arg(self.destination())
            .arg("--")
            .arg(command)
            .output()
            .await?;

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !output.status.success() && !stderr.trim().is_empty() {
            return Err(SshError::CommandFailed {
                exit_code: output.status.code().unwrap_or(-1),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    /// Cancel any pending reconnect, close the transport, and settle on
    /// `Disconnected`. Idempotent; the only path out of the retry loop.
    /// No further reconnects fire afterwards until an explicit
    /// [`connect`](Self::connect).
    pub async fn dispose(&self) {
        {
            let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
            tasks.disposed = true;
            if let Some(handle) = tasks.reconnect.take() {
                handle.abort();
            }
            if let Some(handle) = tasks.monitor.take() {
                handle.abort();
            }
        }

        // Ask the master to exit and clean up its socket; best effort
        let _ = self
            .control_command()
            .args(["-O", "exit"])
            .arg(self.destination())
            .output()
            .await;

        self.set_state(ConnectionState::Disconnected);
    }

    // -----------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------

    fn destination(&self) -> String {
        format!("{}@{}", self.config.user, self.config.host)
    }

    /// Base command for talking to the running master over its socket.
    fn control_command(&self) -> Command {
        let mut cmd = Command::new("ssh");
        cmd.args(["-S", self.control_path.as_str(), "-o", "BatchMode=yes"])
            .stdin(Stdio::null());
        cmd
    }

    fn master_command(&self, key: &Utf8PathBuf) -> Command {
        let connect_timeout = format!("ConnectTimeout={}", self.config.connect_timeout.as_secs());
        let keepalive = format!(
            "ServerAliveInterval={}",
            self.config.keepalive_interval.as_secs()
        );
        let mut cmd = Command::new("ssh");
        cmd.args([
            "-M",
            "-N",
            "-S",
            self.control_path.as_str(),
            "-i",
            key.as_str(),
            "-o",
            "IdentitiesOnly=yes",
            "-o",
            "BatchMode=yes",
            "-o",
            connect_timeout.as_str(),
            "-o",
            keepalive.as_str(),
        ])
        .arg(self.destination())
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
        cmd
    }

    /// Poll the control socket until the master accepts connections.
    async fn wait_ready(&self, master: &mut Child) -> Result<(), SshError> {
        loop {
            if let Some(status) = master.try_wait()? {
                return Err(SshError::Transport(format!(
                    "ssh master exited during setup: {status}"
                )));
            }

            let check = self
                .control_command()
                .args(["-O", "check"])
                .arg(self.destination())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .output()
                .await?;
            if check.status.success() {
                return Ok(());
            }

            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }

    /// Treat master-process exit as a transport close.
    fn watch_master(self: &Arc<Self>, mut master: Child) {
        let session = Arc::clone(self);
        let monitor = tokio::spawn(async move {
            let _ = master.wait().await;
            tracing::warn!(host = %session.config.host, "SSH master exited");
            session.handle_disconnect();
        });

        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = tasks.monitor.replace(monitor) {
            old.abort();
        }
    }

    pub(crate) fn handle_disconnect(self: &Arc<Self>) {
        if self.status() == ConnectionState::Disconnected {
            return;
        }
        self.set_state(ConnectionState::Reconnecting);
        self.schedule_reconnect();
    }

    /// Schedule one fixed-delay reconnect attempt. A no-op while a timer
    /// is already pending or after dispose.
    fn schedule_reconnect(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock().unwrap_or_else(|e| e.into_inner());
        if tasks.disposed {
            return;
        }
        if tasks
            .reconnect
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
        {
            return;
        }

        let session = Arc::clone(self);
        tasks.reconnect = Some(tokio::spawn(async move {
            tokio::time::sleep(session.config.reconnect_delay).await;
            // The slot is cleared only after the attempt resolves, so a
            // concurrent dispose still has a handle to abort.
            let result = session.connect().await;

            let mut tasks = session.tasks.lock().unwrap_or_else(|e| e.into_inner());
            tasks.reconnect = None;
            if tasks.disposed {
                return;
            }
            drop(tasks);

            match result {
                Ok(()) => {}
                Err(e @ SshError::NoCredentialFound(_)) => {
                    tracing::error!(error = %e, "no SSH key available; abandoning reconnect");
                    session.set_state(ConnectionState::Disconnected);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "reconnect attempt failed");
                    session.schedule_reconnect();
                }
            }
        }));
    }

    pub(crate) fn set_state(&self, state: ConnectionState) {
        let changed = self.state_tx.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
        if changed {
            tracing::debug!(?state, "connection state changed");
        }
    }

    #[cfg(test)]
    fn reconnect_pending(&self) -> bool {
        self.tasks
            .lock()
            .unwrap()
            .reconnect
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

fn control_path_for(config: &SshConfig) -> Utf8PathBuf {
    let name = format!("slurmview-{}-{}.ctl", config.user, std::process::id());
    Utf8PathBuf::from_path_buf(std::env::temp_dir().join(&name))
        .unwrap_or_else(|_| Utf8PathBuf::from(format!("/tmp/{name}")))
}
