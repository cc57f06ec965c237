//! Utility functions for value normalization and conversion

use std::net::Ipv6Addr;

use chrono::{DateTime, SecondsFormat, Utc};

/// Normalize an Azure location (e.g., "West Europe" -> "westeurope")
pub fn normalize_location(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Render an IPv6 address in its compressed form
/// e.g., "2607:f8b0:4009:1803:0000:0000:0000:1005" -> "2607:f8b0:4009:1803::1005"
///
/// Unparseable input is returned unchanged.
pub fn normalize_ipv6(s: &str) -> String {
    s.parse::<Ipv6Addr>()
        .map(|ip| ip.to_string())
        .unwrap_or_else(|_| s.to_string())
}

/// Parse an RFC 3339 timestamp into UTC
pub fn parse_rfc3339(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("{:?} is not a valid RFC 3339 timestamp: {}", s, e))
}

/// Format a timestamp as RFC 3339 with a `Z` suffix and no fractional seconds
pub fn format_rfc3339(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Re-render a timestamp Azure returned (which may carry an offset) in UTC
pub fn normalize_rfc3339(s: &str) -> String {
    parse_rfc3339(s)
        .map(|t| format_rfc3339(&t))
        .unwrap_or_else(|_| s.to_string())
}

/// Re-serialize JSON text compactly, so formatting and key order don't matter
///
/// Invalid JSON is returned unchanged.
pub fn normalize_json(s: &str) -> String {
    serde_json::from_str::<serde_json::Value>(s)
        .map(|v| v.to_string())
        .unwrap_or_else(|_| s.to_string())
}

/// Split a string into chunks of at most `size` characters
pub fn chunk_string(s: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = s.chars().collect();
    if chars.is_empty() {
        return vec![String::new()];
    }
    chars
        .chunks(size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}
