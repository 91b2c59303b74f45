//! Fair-share accounting lookup for the monitored user.

use crate::response::SshareResponse;
use crate::types::FairShareInfo;

/// Extract the fair-share record for one user from sshare output.
///
/// Returns a zeroed record carrying the requested username when the user
/// does not appear in the share list.
pub fn parse_fair_share(sshare: &SshareResponse, target_user: &str) -> FairShareInfo {
    let Some(entry) = sshare
        .shares
        .shares
        .iter()
        .find(|s| s.name == target_user)
    else {
        return FairShareInfo::absent(target_user);
    };

    FairShareInfo {
        user: target_user.to_string(),
        raw_shares: entry.shares.as_f64(),
        effective_usage: entry.effective_usage.as_f64(),
        fair_share_factor: entry.fairshare.factor.as_f64(),
    }
}
