//! Rank cluster users by allocated cores.

use crate::response::SqueueResponse;
use crate::types::TopUser;
use std::collections::HashMap;

/// Sum allocated cores per user across RUNNING jobs in the cluster-wide
/// queue, sorted by core count descending.
///
/// Ties break by username ascending so the ranking is deterministic.
pub fn parse_top_users(squeue_all: &SqueueResponse) -> Vec<TopUser> {
    let mut cores_by_user: HashMap<&str, u64> = HashMap::new();

    for job in &squeue_all.jobs {
        if job.job_state.first().map(String::as_str) != Some("RUNNING") {
            continue;
        }
        *cores_by_user.entry(job.user_name.as_str()).or_default() += job.cpus.as_u64();
    }

    let mut users: Vec<TopUser> = cores_by_user
        .into_iter()
        .map(|(user, core_count)| TopUser {
            user: user.to_string(),
            core_count,
        })
        .collect();

    users.sort_by(|a, b| b.core_count.cmp(&a.core_count).then(a.user.cmp(&b.user)));
    users
}
