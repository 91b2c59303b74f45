//! SLURM integration for slurmview.
//!
//! Deserializes the raw `--json` payloads produced by squeue, sinfo,
//! sshare, and sacct (plus free-text quota output) and normalizes them
//! into one unified cluster data model. All functions here are pure;
//! command execution lives in slurmview-ssh and the fetcher.

pub mod fairshare;
pub mod jobs;
pub mod nodes;
pub mod quota;
pub mod response;
pub mod snapshot;
pub mod types;
pub mod users;

pub use fairshare::parse_fair_share;
pub use jobs::parse_my_jobs;
pub use nodes::parse_node_summary;
pub use quota::parse_quota;
pub use snapshot::{RawSnapshot, SnapshotError, parse_snapshot};
pub use types::{
    FairShareInfo, FilesystemQuota, Job, JobState, NodeSummary, QuotaInfo, Snapshot, TopUser,
};
pub use users::parse_top_users;
