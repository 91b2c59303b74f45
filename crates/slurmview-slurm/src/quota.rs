//! Free-text disk quota parsing.
//!
//! The quota probe emits `lfs quota`-style report blocks rather than JSON:
//!
//! ```text
//! Disk quotas for usr jsmith (uid 5001):
//!      Filesystem    used   quota   limit   grace   files   quota   limit   grace
//!    /home/jsmith    8.5G     10G     10G       -   52000  100000  100000       -
//! ```
//!
//! Scanning is tolerant line-by-line: malformed lines are skipped, never an
//! error, so a partially garbled report still yields the parsable entries.

use crate::types::{FilesystemQuota, QuotaInfo};
use once_cell::sync::Lazy;
use regex::Regex;
use slurmview_parsers::parse_size_kb;

static HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^Disk quotas for (?:usr|user|grp|group|prj|project)\s+(\S+)")
        .unwrap()
});

/// Percentage of `limit` consumed, 0 when the limit is absent or zero.
fn percentage(used: f64, limit: f64) -> f64 {
    if limit > 0.0 { used / limit * 100.0 } else { 0.0 }
}

fn parse_data_line(line: &str, owner: &str) -> Option<FilesystemQuota> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    // filesystem, used, soft, hard, grace, files, soft, hard[, grace]
    if fields.len() < 8 || !fields[0].starts_with('/') {
        return None;
    }

    // An asterisk on a used value is the over-quota marker
    let space_starred = fields[1].ends_with('*');
    let files_starred = fields[5].ends_with('*');

    let space_used = fields[1].trim_end_matches('*');
    let space_limit = fields[3];
    let files_used = fields[5].trim_end_matches('*');
    let files_limit = fields[7];

    let used_kb = parse_size_kb(space_used)?;
    let limit_kb = parse_size_kb(space_limit).unwrap_or(0.0);
    let used_files: f64 = files_used.parse().ok()?;
    let limit_files: f64 = files_limit.parse().unwrap_or(0.0);

    let over_quota = space_starred
        || files_starred
        || (limit_kb > 0.0 && used_kb > limit_kb)
        || (limit_files > 0.0 && used_files > limit_files);

    Some(FilesystemQuota {
        filesystem: fields[0].to_string(),
        owner: owner.to_string(),
        space_used: space_used.to_string(),
        space_limit: space_limit.to_string(),
        space_pct: percentage(used_kb, limit_kb),
        files_used: files_used.to_string(),
        files_limit: files_limit.to_string(),
        files_pct: percentage(used_files, limit_files),
        over_quota,
    })
}

/// Parse quota command output into per-filesystem entries.
///
/// Never fails; unparsable content simply produces fewer entries.
pub fn parse_quota(text: &str) -> QuotaInfo {
    let mut filesystems = Vec::new();
    let mut owner: Option<String> = None;

    for line in text.lines() {
        if let Some(caps) = HEADER_RE.captures(line) {
            owner = Some(caps[1].to_string());
            continue;
        }
        let Some(ref current_owner) = owner else {
            continue;
        };
        match parse_data_line(line, current_owner) {
            Some(entry) => filesystems.push(entry),
            None => {
                if line.trim_start().starts_with('/') {
                    tracing::debug!("skipping unparsable quota line: {}", line);
                }
            }
        }
    }

    QuotaInfo { filesystems }
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUOTA_TEXT: &str = "\
Disk quotas for usr jsmith (uid 5001):
     Filesystem    used   quota   limit   grace   files   quota   limit   grace
  /home/jsmith    8.5G     10G     10G       -   52000  100000  100000       -
Disk quotas for grp oz042 (gid 9042):
     Filesystem    used   quota   limit   grace   files   quota   limit   grace
   /fred/oz042    1.8T*     1T      2T      6d  240000  500000  500000       -
";

    #[test]
    fn test_two_blocks() {
        let quota = parse_quota(QUOTA_TEXT);
        assert_eq!(quota.filesystems.len(), 2);

        let home = &quota.filesystems[0];
        assert_eq!(home.filesystem, "/home/jsmith");
        assert_eq!(home.owner, "jsmith");
        assert_eq!(home.space_used, "8.5G");
        assert_eq!(home.space_limit, "10G");
        assert!((home.space_pct - 85.0).abs() < 0.001);
        assert_eq!(home.files_used, "52000");
        assert!((home.files_pct - 52.0).abs() < 0.001);
        assert!(!home.over_quota);
    }

    #[test]
    fn test_star_marks_over_quota() {
        let quota = parse_quota(QUOTA_TEXT);
        let fred = &quota.filesystems[1];
        assert_eq!(fred.owner, "oz042");
        assert!(fred.over_quota);
        // The star is stripped from the stored string
        assert_eq!(fred.space_used, "1.8T");
        assert!((fred.space_pct - 90.0).abs() < 0.001);
    }

    #[test]
    fn test_used_over_limit_without_star() {
        let text = "\
Disk quotas for usr jsmith (uid 5001):
  /scratch/j    3.0T     2T      2T       -   100  200  200       -
";
        let quota = parse_quota(text);
        assert_eq!(quota.filesystems.len(), 1);
        assert!(quota.filesystems[0].over_quota);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let text = "\
quota: cannot resolve mountpoint for /flaky
Disk quotas for usr jsmith (uid 5001):
  /home/jsmith  8.5G  10G  10G  -  52000  100000  100000  -
  /broken  not-a-size  10G
garbage in the middle
";
        let quota = parse_quota(text);
        assert_eq!(quota.filesystems.len(), 1);
        assert_eq!(quota.filesystems[0].filesystem, "/home/jsmith");
    }

    #[test]
    fn test_rows_before_any_header_skipped() {
        let text = "  /orphan  8.5G  10G  10G  -  1  2  2  -\n";
        assert!(parse_quota(text).filesystems.is_empty());
    }

    #[test]
    fn test_zero_limit_gives_zero_percentage() {
        let text = "\
Disk quotas for usr jsmith (uid 5001):
  /home/jsmith  8.5G  0  0  -  52000  0  0  -
";
        let quota = parse_quota(text);
        assert_eq!(quota.filesystems[0].space_pct, 0.0);
        assert_eq!(quota.filesystems[0].files_pct, 0.0);
        assert!(!quota.filesystems[0].over_quota);
    }

    #[test]
    fn test_empty_text() {
        assert!(parse_quota("").filesystems.is_empty());
    }
}
