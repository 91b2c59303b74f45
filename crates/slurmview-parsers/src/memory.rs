//! Memory and disk-size formatting utilities.

/// Format megabytes as a human-readable string (e.g. "2.0 GB", "512 MB").
pub fn format_mb(mb: u64) -> String {
    if mb >= 1024 {
        format!("{:.1} GB", mb as f64 / 1024.0)
    } else {
        format!("{} MB", mb)
    }
}

/// Parse a quota-style size string into kilobytes.
///
/// Accepts suffixes K/M/G/T/P, optionally followed by "B" or "iB"
/// (e.g. "8.5G", "1.2TiB", "512M"). Bare numbers are kilobytes, the
/// default unit of `lfs quota` output.
pub fn parse_size_kb(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() || s == "-" {
        return None;
    }

    let trimmed = s.trim_end_matches("iB").trim_end_matches('B');
    let (value_part, multiplier) = match trimmed.chars().last()? {
        'K' | 'k' => (&trimmed[..trimmed.len() - 1], 1.0),
        'M' | 'm' => (&trimmed[..trimmed.len() - 1], 1024.0),
        'G' | 'g' => (&trimmed[..trimmed.len() - 1], 1024.0 * 1024.0),
        'T' | 't' => (&trimmed[..trimmed.len() - 1], 1024.0 * 1024.0 * 1024.0),
        'P' | 'p' => (
            &trimmed[..trimmed.len() - 1],
            1024.0 * 1024.0 * 1024.0 * 1024.0,
        ),
        _ => (trimmed, 1.0),
    };

    let value: f64 = value_part.trim().parse().ok()?;
    Some(value * multiplier)
}
