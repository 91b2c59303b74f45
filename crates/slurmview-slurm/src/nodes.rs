//! Cluster-wide node summary derived from sinfo.

use crate::response::SinfoResponse;
use crate::types::NodeSummary;
use std::collections::HashMap;

struct NodeRecord {
    states: Vec<String>,
    cpus_total: u64,
    cpus_allocated: u64,
    cpus_idle: u64,
}

/// Aggregate sinfo groupings into one cluster-wide summary.
///
/// Groupings may list overlapping node names (the same node under several
/// partition/feature combinations). Each node name is recorded once,
/// first-seen-wins, with per-node CPU counts taken as the floor of the
/// grouping's aggregate divided by its node count. Classification buckets
/// are mutually exclusive with precedence DOWN/DRAIN > ALLOCATED > MIXED >
/// IDLE; a node matching none still counts toward the total.
pub fn parse_node_summary(sinfo: &SinfoResponse) -> NodeSummary {
    let mut nodes: HashMap<&str, NodeRecord> = HashMap::new();

    for entry in &sinfo.sinfo {
        let names = &entry.nodes.nodes;
        let n = names.len() as u64;
        if n == 0 {
            continue;
        }

        let cpus_total = entry.cpus.total / n;
        let cpus_allocated = entry.cpus.allocated / n;
        let cpus_idle = entry.cpus.idle / n;

        for name in names {
            nodes.entry(name.as_str()).or_insert_with(|| NodeRecord {
                states: entry.node.state.clone(),
                cpus_total,
                cpus_allocated,
                cpus_idle,
            });
        }
    }

    let mut summary = NodeSummary {
        total_nodes: nodes.len() as u64,
        ..NodeSummary::default()
    };

    for record in nodes.values() {
        let has = |tag: &str| record.states.iter().any(|s| s == tag);
        if has("DOWN") || has("DRAIN") {
            summary.down_nodes += 1;
        } else if has("ALLOCATED") {
            summary.allocated_nodes += 1;
        } else if has("MIXED") {
            summary.mixed_nodes += 1;
        } else if has("IDLE") {
            summary.idle_nodes += 1;
        }
        summary.total_cpus += record.cpus_total;
        summary.allocated_cpus += record.cpus_allocated;
        summary.idle_cpus += record.cpus_idle;
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    const SINFO_JSON: &str = r#"{
        "sinfo": [
            {
                "node": {"state": ["ALLOCATED"]},
                "nodes": {"allocated": 2, "idle": 0, "other": 0, "total": 2,
                          "nodes": ["john01", "john02"]},
                "cpus": {"allocated": 64, "idle": 0, "other": 0, "total": 64}
            },
            {
                "node": {"state": ["MIXED"]},
                "nodes": {"allocated": 0, "idle": 0, "other": 2, "total": 2,
                          "nodes": ["john02", "john03"]},
                "cpus": {"allocated": 32, "idle": 32, "other": 0, "total": 64}
            },
            {
                "node": {"state": ["IDLE", "DRAIN"]},
                "nodes": {"allocated": 0, "idle": 1, "other": 0, "total": 1,
                          "nodes": ["john04"]},
                "cpus": {"allocated": 0, "idle": 32, "other": 0, "total": 32}
            }
        ]
    }"#;

    #[test]
    fn test_overlapping_nodes_deduplicated() {
        let sinfo: SinfoResponse = serde_json::from_str(SINFO_JSON).unwrap();
        let summary = parse_node_summary(&sinfo);

        // john02 appears in two groupings but is counted once; the raw
        // payload mentions 5 node names across 4 unique nodes
        assert_eq!(summary.total_nodes, 4);
        assert_eq!(summary.allocated_nodes, 2);
        assert_eq!(summary.mixed_nodes, 1);
        assert_eq!(summary.down_nodes, 1);
        assert_eq!(summary.idle_nodes, 0);
    }

    #[test]
    fn test_bucket_counts_sum_to_total() {
        let sinfo: SinfoResponse = serde_json::from_str(SINFO_JSON).unwrap();
        let s = parse_node_summary(&sinfo);
        assert_eq!(
            s.allocated_nodes + s.idle_nodes + s.down_nodes + s.mixed_nodes,
            s.total_nodes
        );
        assert!(s.allocated_cpus + s.idle_cpus <= s.total_cpus);
    }

    #[test]
    fn test_first_seen_wins_cpu_division() {
        let sinfo: SinfoResponse = serde_json::from_str(SINFO_JSON).unwrap();
        let s = parse_node_summary(&sinfo);
        // john01/john02 from the first grouping at 32 CPUs each, john03
        // from the second at 32, john04 at 32
        assert_eq!(s.total_cpus, 128);
        // 32 + 32 (first grouping) + 16 (john03) + 0
        assert_eq!(s.allocated_cpus, 80);
    }

    #[test]
    fn test_drain_takes_precedence_over_idle() {
        let json = r#"{"sinfo": [{
            "node": {"state": ["IDLE", "DRAIN"]},
            "nodes": {"total": 1, "nodes": ["n1"]},
            "cpus": {"total": 8}
        }]}"#;
        let sinfo: SinfoResponse = serde_json::from_str(json).unwrap();
        let s = parse_node_summary(&sinfo);
        assert_eq!(s.down_nodes, 1);
        assert_eq!(s.idle_nodes, 0);
    }

    #[test]
    fn test_unrecognized_state_counts_in_total_only() {
        let json = r#"{"sinfo": [{
            "node": {"state": ["FUTURE"]},
            "nodes": {"total": 1, "nodes": ["n1"]},
            "cpus": {"total": 8}
        }]}"#;
        let sinfo: SinfoResponse = serde_json::from_str(json).unwrap();
        let s = parse_node_summary(&sinfo);
        assert_eq!(s.total_nodes, 1);
        assert_eq!(
            s.allocated_nodes + s.idle_nodes + s.down_nodes + s.mixed_nodes,
            0
        );
    }

    #[test]
    fn test_empty_payload() {
        let sinfo: SinfoResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(parse_node_summary(&sinfo), NodeSummary::default());
    }
}
