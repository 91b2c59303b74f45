//! Snapshot orchestration: run the fixed query batch over SSH.

use chrono::Utc;
use slurmview_slurm::{RawSnapshot, Snapshot, SnapshotError, parse_snapshot};
use slurmview_ssh::{SshError, SshSession};
use std::sync::Arc;
use thiserror::Error;

/// Default line count for remote log tails.
pub const DEFAULT_TAIL_LINES: u32 = 4;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error(transparent)]
    Ssh(#[from] SshError),
    #[error(transparent)]
    Parse(#[from] SnapshotError),
}

/// The fixed set of remote queries, parameterized by the monitored user.
#[derive(Debug, Clone)]
struct Commands {
    squeue: String,
    squeue_all: String,
    sinfo: String,
    sshare: String,
    sacct: String,
    quota: String,
}

impl Commands {
    fn for_user(user: &str) -> Self {
        Self {
            squeue: format!("squeue -u {user} --json"),
            squeue_all: "squeue --all --json".to_string(),
            sinfo: "sinfo --json".to_string(),
            sshare: format!("sshare -u {user} --json"),
            sacct: format!("sacct -u {user} --starttime=now-24hours --json"),
            quota: "quota -s".to_string(),
        }
    }
}

/// Fetches and assembles cluster snapshots over the shared session.
pub struct SlurmFetcher {
    session: Arc<SshSession>,
    user: String,
    commands: Commands,
}

impl SlurmFetcher {
    pub fn new(session: Arc<SshSession>, user: impl Into<String>) -> Self {
        let user = user.into();
        let commands = Commands::for_user(&user);
        Self {
            session,
            user,
            commands,
        }
    }

    /// Run all queries concurrently and assemble one snapshot.
    ///
    /// Every query must succeed except the quota probe, whose failure is
    /// swallowed and reported as "no quota data". The capture timestamp is
    /// taken after all queries resolve.
    pub async fn fetch_all(&self) -> Result<Snapshot, FetchError> {
        let (squeue, squeue_all, sinfo, sshare, sacct, quota) = tokio::try_join!(
            self.session.exec(&self.commands.squeue),
            self.session.exec(&self.commands.squeue_all),
            self.session.exec(&self.commands.sinfo),
            self.session.exec(&self.commands.sshare),
            self.session.exec(&self.commands.sacct),
            async { Ok::<_, SshError>(self.session.exec(&self.commands.quota).await.ok()) },
        )?;

        let raw = RawSnapshot {
            squeue,
            squeue_all,
            sinfo,
            sshare,
            sacct,
            quota,
        };
        Ok(parse_snapshot(&raw, &self.user, Utc::now())?)
    }

    /// Fetch the last `lines` lines of a remote file (e.g. a job stdout
    /// log). Errors propagate unchanged.
    pub async fn fetch_log_tail(&self, path: &str, lines: u32) -> Result<String, SshError> {
        self.session
            .exec(&format!("tail -n {} {}", lines, shell_quote(path)))
            .await
    }
}

/// Single-quote a path for the remote shell.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}
