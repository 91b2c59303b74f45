//! Serde schemas for raw SLURM `--json` payloads.
//!
//! One wrapper type per source command, mirroring the shape the scheduler
//! actually emits. Every field defaults so partially-absent payloads
//! deserialize cleanly; extraction then goes through defaulting accessors
//! rather than assuming a field exists.

use serde::Deserialize;

/// The SLURM `{set, infinite, number}` numeric wrapper.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct SlurmNumber {
    #[serde(default)]
    pub set: bool,
    #[serde(default)]
    pub infinite: bool,
    #[serde(default)]
    pub number: f64,
}

impl SlurmNumber {
    pub fn as_f64(&self) -> f64 {
        self.number
    }

    pub fn as_i64(&self) -> i64 {
        self.number as i64
    }

    pub fn as_u64(&self) -> u64 {
        if self.number > 0.0 { self.number as u64 } else { 0 }
    }
}

// --- squeue ---------------------------------------------------------------

/// `squeue --json` wrapper (both `-u <user>` and `--all` forms).
#[derive(Debug, Default, Deserialize)]
pub struct SqueueResponse {
    #[serde(default)]
    pub jobs: Vec<QueueJob>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QueueJob {
    #[serde(default)]
    pub job_id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub job_state: Vec<String>,
    #[serde(default)]
    pub partition: String,
    #[serde(default)]
    pub cpus: SlurmNumber,
    #[serde(default)]
    pub memory_per_cpu: SlurmNumber,
    #[serde(default)]
    pub node_count: SlurmNumber,
    #[serde(default)]
    pub nodes: String,
    #[serde(default)]
    pub submit_time: SlurmNumber,
    #[serde(default)]
    pub start_time: SlurmNumber,
    #[serde(default)]
    pub time_limit: SlurmNumber,
    #[serde(default)]
    pub state_reason: String,
    #[serde(default)]
    pub standard_output: String,
}

// --- sacct ----------------------------------------------------------------

/// `sacct --json` wrapper.
#[derive(Debug, Default, Deserialize)]
pub struct SacctResponse {
    #[serde(default)]
    pub jobs: Vec<AcctJob>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AcctJob {
    #[serde(default)]
    pub job_id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: AcctState,
    #[serde(default)]
    pub partition: String,
    #[serde(default)]
    pub time: AcctTime,
    #[serde(default)]
    pub association: AcctAssociation,
    #[serde(default)]
    pub exit_code: AcctExitCode,
    #[serde(default)]
    pub allocation_nodes: u64,
    #[serde(default)]
    pub nodes: String,
    #[serde(default)]
    pub tres: AcctTres,
}

#[derive(Debug, Default, Deserialize)]
pub struct AcctState {
    #[serde(default)]
    pub current: Vec<String>,
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AcctTime {
    #[serde(default)]
    pub elapsed: i64,
    #[serde(default)]
    pub submission: i64,
    #[serde(default)]
    pub start: i64,
    #[serde(default)]
    pub limit: SlurmNumber,
}

#[derive(Debug, Default, Deserialize)]
pub struct AcctAssociation {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub account: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AcctExitCode {
    #[serde(default)]
    pub return_code: SlurmNumber,
    #[serde(default)]
    pub status: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AcctTres {
    #[serde(default)]
    pub allocated: Vec<TresEntry>,
    #[serde(default)]
    pub requested: Vec<TresEntry>,
}

/// Tagged trackable-resource entry ("cpu" for cores, "mem" for MB).
#[derive(Debug, Default, Deserialize)]
pub struct TresEntry {
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub count: i64,
}

// --- sinfo ----------------------------------------------------------------

/// `sinfo --json` wrapper.
#[derive(Debug, Default, Deserialize)]
pub struct SinfoResponse {
    #[serde(default)]
    pub sinfo: Vec<SinfoEntry>,
}

/// One partition/feature grouping. Groupings may list overlapping nodes.
#[derive(Debug, Default, Deserialize)]
pub struct SinfoEntry {
    #[serde(default)]
    pub node: SinfoNodeState,
    #[serde(default)]
    pub nodes: SinfoNodes,
    #[serde(default)]
    pub cpus: SinfoCpus,
}

#[derive(Debug, Default, Deserialize)]
pub struct SinfoNodeState {
    #[serde(default)]
    pub state: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SinfoNodes {
    #[serde(default)]
    pub allocated: u64,
    #[serde(default)]
    pub idle: u64,
    #[serde(default)]
    pub other: u64,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub nodes: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SinfoCpus {
    #[serde(default)]
    pub allocated: u64,
    #[serde(default)]
    pub idle: u64,
    #[serde(default)]
    pub other: u64,
    #[serde(default)]
    pub total: u64,
}

// --- sshare ---------------------------------------------------------------

/// `sshare --json` wrapper.
#[derive(Debug, Default, Deserialize)]
pub struct SshareResponse {
    #[serde(default)]
    pub shares: ShareList,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShareList {
    #[serde(default)]
    pub shares: Vec<ShareEntry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShareEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub fairshare: ShareFactor,
    #[serde(default)]
    pub effective_usage: SlurmNumber,
    #[serde(default)]
    pub shares: SlurmNumber,
}

#[derive(Debug, Default, Deserialize)]
pub struct ShareFactor {
    #[serde(default)]
    pub factor: SlurmNumber,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slurm_number_defaults_to_zero() {
        let n: SlurmNumber = serde_json::from_str("{}").unwrap();
        assert_eq!(n.as_u64(), 0);
        assert_eq!(n.as_i64(), 0);

        let n: SlurmNumber =
            serde_json::from_str(r#"{"set": true, "infinite": false, "number": 16}"#).unwrap();
        assert_eq!(n.as_u64(), 16);
    }

    #[test]
    fn test_partial_queue_job() {
        // A job record with most fields missing still deserializes
        let j: QueueJob = serde_json::from_str(r#"{"job_id": 42}"#).unwrap();
        assert_eq!(j.job_id, 42);
        assert!(j.job_state.is_empty());
        assert_eq!(j.cpus.as_u64(), 0);
        assert!(j.nodes.is_empty());
    }

    #[test]
    fn test_empty_squeue_response() {
        let r: SqueueResponse = serde_json::from_str("{}").unwrap();
        assert!(r.jobs.is_empty());
    }
}
