//! Merge live-queue and historical-accounting payloads into the job list.

use crate::response::{AcctJob, QueueJob, SacctResponse, SqueueResponse};
use crate::types::{Job, JobState};
use chrono::{DateTime, Utc};
use slurmview_parsers::{epoch_to_rfc3339, format_elapsed, format_mb, format_time_limit};
use std::collections::HashSet;

/// Placeholder state when the source omits the state tag entirely.
fn state_from_tags(tags: &[String]) -> JobState {
    tags.first()
        .map(|t| JobState::from_tag(t))
        .unwrap_or_else(|| JobState::Unknown("UNKNOWN".to_string()))
}

fn reason_or_none(reason: &str) -> String {
    if reason.is_empty() {
        "None".to_string()
    } else {
        reason.to_string()
    }
}

fn live_job(j: &QueueJob, now: DateTime<Utc>) -> Job {
    let cpus = j.cpus.as_u64();
    let mem_mb = j.memory_per_cpu.as_u64() * cpus;

    let submit_epoch = j.submit_time.as_i64();
    let start_epoch = j.start_time.as_i64();

    // Elapsed = now - start for started jobs
    let elapsed_sec = if start_epoch > 0 {
        (now.timestamp() - start_epoch).max(0) as u64
    } else {
        0
    };

    Job {
        job_id: j.job_id,
        name: j.name.clone(),
        user: j.user_name.clone(),
        state: state_from_tags(&j.job_state),
        partition: j.partition.clone(),
        num_cpus: cpus as u32,
        num_nodes: j.node_count.as_u64() as u32,
        node_list: j.nodes.clone(),
        time_elapsed: format_elapsed(elapsed_sec),
        time_limit: format_time_limit(j.time_limit.as_i64()),
        submit_time: epoch_to_rfc3339(submit_epoch),
        start_time: epoch_to_rfc3339(start_epoch),
        reason: reason_or_none(&j.state_reason),
        stdout_path: j.standard_output.clone(),
        memory_requested: format_mb(mem_mb),
        memory_used: None,
        exit_code: None,
    }
}

fn historical_job(j: &AcctJob) -> Job {
    // Cores come from the TRES entry tagged "cpu", memory (MB) from the
    // one tagged "mem"; absence leaves the prior default.
    let mut num_cpus = j.allocation_nodes;
    if let Some(cpu) = j.tres.allocated.iter().find(|t| t.kind == "cpu") {
        num_cpus = cpu.count.max(0) as u64;
    }
    let mem_mb = j
        .tres
        .requested
        .iter()
        .find(|t| t.kind == "mem")
        .map(|t| t.count.max(0) as u64)
        .unwrap_or(0);

    Job {
        job_id: j.job_id,
        name: j.name.clone(),
        user: j.association.user.clone(),
        state: state_from_tags(&j.state.current),
        partition: j.partition.clone(),
        num_cpus: num_cpus as u32,
        num_nodes: j.allocation_nodes as u32,
        node_list: j.nodes.clone(),
        time_elapsed: format_elapsed(j.time.elapsed.max(0) as u64),
        time_limit: format_time_limit(j.time.limit.as_i64()),
        submit_time: epoch_to_rfc3339(j.time.submission),
        start_time: epoch_to_rfc3339(j.time.start),
        reason: reason_or_none(&j.state.reason),
        stdout_path: String::new(),
        memory_requested: format_mb(mem_mb),
        memory_used: None,
        exit_code: Some(j.exit_code.return_code.as_i64().to_string()),
    }
}

/// Build the merged job list from the user's live queue, enriched with
/// historical accounting records.
///
/// A job present in both sources appears exactly once, with the live-queue
/// version taking precedence. `now` anchors elapsed-time computation for
/// running jobs.
pub fn parse_my_jobs(
    squeue: &SqueueResponse,
    sacct: Option<&SacctResponse>,
    now: DateTime<Utc>,
) -> Vec<Job> {
    let mut jobs: Vec<Job> = squeue.jobs.iter().map(|j| live_job(j, now)).collect();

    if let Some(sacct) = sacct {
        let live_ids: HashSet<u64> = jobs.iter().map(|j| j.job_id).collect();
        jobs.extend(
            sacct
                .jobs
                .iter()
                .filter(|j| !live_ids.contains(&j.job_id))
                .map(historical_job),
        );
    }

    jobs
}
