use chrono::{DateTime, Utc};

/// Compact count for card stats: `1.2m`, `3.4k`, or the plain number.
pub fn format_stat(n: u64) -> String {
    if n >= 1_000_000 {
        format!("{:.1}m", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}k", n as f64 / 1_000.0)
    } else {
        n.to_string()
    }
}

pub fn format_updated(updated_at: &DateTime<Utc>) -> String {
    updated_at.format("%b %-d, %Y").to_string()
}
