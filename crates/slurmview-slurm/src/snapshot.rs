//! Pure snapshot assembly from raw command output.

use crate::response::{SacctResponse, SinfoResponse, SqueueResponse, SshareResponse};
use crate::types::Snapshot;
use crate::{parse_fair_share, parse_my_jobs, parse_node_summary, parse_quota, parse_top_users};
use chrono::{DateTime, Utc};
use thiserror::Error;

/// Raw stdout of each remote query, as collected by the fetcher.
#[derive(Debug, Clone)]
pub struct RawSnapshot {
    pub squeue: String,
    pub squeue_all: String,
    pub sinfo: String,
    pub sshare: String,
    pub sacct: String,
    /// None when the quota probe failed; its absence never fails a fetch
    pub quota: Option<String>,
}

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("failed to parse {command} output: {source}")]
    Json {
        command: &'static str,
        source: serde_json::Error,
    },
}

fn parse_json<T: serde::de::DeserializeOwned>(
    raw: &str,
    command: &'static str,
) -> Result<T, SnapshotError> {
    serde_json::from_str(raw).map_err(|source| SnapshotError::Json { command, source })
}

/// Parse all raw payloads into one immutable snapshot.
///
/// `now` anchors elapsed-time computation and becomes the capture
/// timestamp; the fetcher takes it after all queries resolve.
pub fn parse_snapshot(
    raw: &RawSnapshot,
    user: &str,
    now: DateTime<Utc>,
) -> Result<Snapshot, SnapshotError> {
    let squeue: SqueueResponse = parse_json(&raw.squeue, "squeue")?;
    let squeue_all: SqueueResponse = parse_json(&raw.squeue_all, "squeue --all")?;
    let sinfo: SinfoResponse = parse_json(&raw.sinfo, "sinfo")?;
    let sshare: SshareResponse = parse_json(&raw.sshare, "sshare")?;
    let sacct: SacctResponse = parse_json(&raw.sacct, "sacct")?;

    Ok(Snapshot {
        jobs: parse_my_jobs(&squeue, Some(&sacct), now),
        node_summary: parse_node_summary(&sinfo),
        top_users: parse_top_users(&squeue_all),
        fair_share: parse_fair_share(&sshare, user),
        quota: raw.quota.as_deref().map(parse_quota),
        last_updated: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SQUEUE: &str = r#"{
        "jobs": [
            {"job_id": 201, "name": "train_model", "user_name": "jsmith",
             "job_state": ["RUNNING"], "partition": "milan",
             "cpus": {"number": 16}, "memory_per_cpu": {"number": 512},
             "node_count": {"number": 1}, "nodes": "john21",
             "submit_time": {"number": 1705309200},
             "start_time": {"number": 1705312800},
             "time_limit": {"number": 2880}},
            {"job_id": 202, "name": "postprocess", "user_name": "jsmith",
             "job_state": ["RUNNING"], "partition": "milan",
             "cpus": {"number": 4}, "memory_per_cpu": {"number": 1024},
             "node_count": {"number": 1}, "nodes": "john22",
             "submit_time": {"number": 1705310100},
             "start_time": {"number": 1705313700},
             "time_limit": {"number": 120}}
        ]
    }"#;

    const SQUEUE_ALL: &str = r#"{
        "jobs": [
            {"user_name": "jsmith", "job_state": ["RUNNING"], "cpus": {"number": 20}},
            {"user_name": "alice", "job_state": ["RUNNING"], "cpus": {"number": 64}}
        ]
    }"#;

    const SINFO: &str = r#"{
        "sinfo": [
            {"node": {"state": ["ALLOCATED"]},
             "nodes": {"total": 2, "nodes": ["john21", "john22"]},
             "cpus": {"allocated": 64, "idle": 0, "total": 64}},
            {"node": {"state": ["ALLOCATED"]},
             "nodes": {"total": 2, "nodes": ["john22", "john23"]},
             "cpus": {"allocated": 64, "idle": 0, "total": 64}}
        ]
    }"#;

    const SSHARE: &str = r#"{
        "shares": {"shares": [
            {"name": "jsmith", "shares": {"number": 1},
             "effective_usage": {"number": 0.002},
             "fairshare": {"factor": {"number": 0.91}}}
        ]}
    }"#;

    const SACCT: &str = r#"{
        "jobs": [
            {"job_id": 202, "name": "postprocess",
             "state": {"current": ["RUNNING"], "reason": ""},
             "time": {"elapsed": 60, "submission": 1705310100, "start": 1705313700,
                      "limit": {"number": 120}},
             "association": {"user": "jsmith"}, "allocation_nodes": 1},
            {"job_id": 199, "name": "qc_report",
             "state": {"current": ["COMPLETED"], "reason": ""},
             "partition": "milan",
             "time": {"elapsed": 740, "submission": 1705220000, "start": 1705221000,
                      "limit": {"number": 30}},
             "association": {"user": "jsmith"},
             "exit_code": {"return_code": {"number": 0}},
             "allocation_nodes": 1, "nodes": "john09",
             "tres": {"allocated": [{"type": "cpu", "count": 2}],
                      "requested": [{"type": "mem", "count": 512}]}}
        ]
    }"#;

    fn raw() -> RawSnapshot {
        RawSnapshot {
            squeue: SQUEUE.to_string(),
            squeue_all: SQUEUE_ALL.to_string(),
            sinfo: SINFO.to_string(),
            sshare: SSHARE.to_string(),
            sacct: SACCT.to_string(),
            quota: None,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(1_705_316_400, 0).unwrap()
    }

    #[test]
    fn test_end_to_end_assembly() {
        let snapshot = parse_snapshot(&raw(), "jsmith", now()).unwrap();

        // 2 live + 1 new historical; the duplicate of job 202 is dropped
        assert_eq!(snapshot.jobs.len(), 3);
        assert_eq!(
            snapshot
                .jobs
                .iter()
                .filter(|j| j.job_id == 202)
                .count(),
            1
        );

        // 4 raw node mentions collapse to 3 unique nodes
        assert_eq!(snapshot.node_summary.total_nodes, 3);

        assert_eq!(snapshot.fair_share.fair_share_factor, 0.91);
        assert_eq!(snapshot.top_users[0].user, "alice");
        assert!(snapshot.quota.is_none());
        assert_eq!(snapshot.last_updated, now());
    }

    #[test]
    fn test_quota_text_included_when_present() {
        let mut r = raw();
        r.quota = Some(
            "Disk quotas for usr jsmith (uid 5001):\n\
             /home/jsmith  1G  10G  10G  -  10  100  100  -\n"
                .to_string(),
        );
        let snapshot = parse_snapshot(&r, "jsmith", now()).unwrap();
        let quota = snapshot.quota.unwrap();
        assert_eq!(quota.filesystems.len(), 1);
    }

    #[test]
    fn test_broken_json_surfaces_the_failing_command() {
        let mut r = raw();
        r.sinfo = "slurm_load_partitions: Unable to contact slurm controller".to_string();
        let err = parse_snapshot(&r, "jsmith", now()).unwrap_err();
        assert!(err.to_string().contains("sinfo"));
    }
}
