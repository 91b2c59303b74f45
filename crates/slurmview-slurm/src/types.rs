//! Unified cluster data model.

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// Lifecycle state of a scheduler job.
///
/// Unrecognized state tags are passed through as `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Running,
    Pending,
    Completed,
    Failed,
    Cancelled,
    Timeout,
    OutOfMemory,
    Unknown(String),
}

impl JobState {
    /// Parse a SLURM state tag (e.g. the first element of `job_state`).
    pub fn from_tag(tag: &str) -> Self {
        // sacct states can have suffixes like "CANCELLED by 12345"
        let base = tag.split_whitespace().next().unwrap_or(tag);
        match base.to_uppercase().as_str() {
            "RUNNING" => Self::Running,
            "PENDING" => Self::Pending,
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            "CANCELLED" => Self::Cancelled,
            "TIMEOUT" => Self::Timeout,
            "OUT_OF_MEMORY" => Self::OutOfMemory,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Running => "RUNNING",
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
            Self::Timeout => "TIMEOUT",
            Self::OutOfMemory => "OUT_OF_MEMORY",
            Self::Unknown(s) => s,
        }
    }
}

impl Serialize for JobState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One job in the merged live + historical view.
///
/// Rebuilt from scratch on every snapshot fetch; never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    /// Scheduler job ID, unique across the merged view
    pub job_id: u64,
    pub name: String,
    pub user: String,
    pub state: JobState,
    pub partition: String,
    pub num_cpus: u32,
    pub num_nodes: u32,
    /// Raw node list string, may be empty
    pub node_list: String,
    /// Elapsed walltime, "H:MM:SS"
    pub time_elapsed: String,
    /// Walltime limit, "D-HH:MM:SS" / "HH:MM:SS" / "N/A"
    pub time_limit: String,
    /// RFC-3339 or "N/A"
    pub submit_time: String,
    /// RFC-3339 or "N/A"
    pub start_time: String,
    /// Pending or termination reason, "None" when absent
    pub reason: String,
    /// Standard-output file path, empty when not applicable
    pub stdout_path: String,
    /// Requested memory, human formatted (e.g. "2.0 GB")
    pub memory_requested: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<String>,
}

/// Cluster-wide node and CPU aggregate derived from sinfo.
///
/// Each node falls in exactly one of the four counted buckets, so
/// `allocated + idle + down + mixed == total`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub total_nodes: u64,
    pub allocated_nodes: u64,
    pub idle_nodes: u64,
    pub down_nodes: u64,
    pub mixed_nodes: u64,
    pub total_cpus: u64,
    pub allocated_cpus: u64,
    pub idle_cpus: u64,
}

/// One entry in the allocated-core user ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopUser {
    pub user: String,
    pub core_count: u64,
}

/// Fair-share accounting record for the monitored user.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FairShareInfo {
    pub user: String,
    pub raw_shares: f64,
    pub effective_usage: f64,
    /// Normalized priority factor in [0, 1]; 0 when the user is absent
    pub fair_share_factor: f64,
}

impl FairShareInfo {
    /// Zeroed record for a user absent from the share list.
    pub fn absent(user: &str) -> Self {
        Self {
            user: user.to_string(),
            raw_shares: 0.0,
            effective_usage: 0.0,
            fair_share_factor: 0.0,
        }
    }
}

/// Per-filesystem disk quota entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilesystemQuota {
    pub filesystem: String,
    pub owner: String,
    pub space_used: String,
    pub space_limit: String,
    pub space_pct: f64,
    pub files_used: String,
    pub files_limit: String,
    pub files_pct: f64,
    pub over_quota: bool,
}

/// Disk quota view across all reported filesystems.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QuotaInfo {
    pub filesystems: Vec<FilesystemQuota>,
}

/// One immutable, fully-assembled view of cluster + job + accounting state.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub jobs: Vec<Job>,
    pub node_summary: NodeSummary,
    pub top_users: Vec<TopUser>,
    pub fair_share: FairShareInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quota: Option<QuotaInfo>,
    pub last_updated: DateTime<Utc>,
}
