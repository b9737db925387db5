//! Small utility helpers used across modules.

use chrono::{DateTime, Utc};

/// Scores live in 0..=100 everywhere.
/// Clamp defensively when data arrives from a rule-set bank or the wire.
pub fn clamp_score(score: u32) -> u32 {
  score.min(100)
}

/// Tolerant RFC 3339 parsing for wire and cache timestamps.
/// Malformed input drops the timestamp instead of failing the whole payload.
pub fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s.trim())
    .ok()
    .map(|dt| dt.with_timezone(&Utc))
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge response bodies or learner submissions.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut cut = max;
  while cut > 0 && !s.is_char_boundary(cut) {
    cut -= 1;
  }
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parse_rfc3339_accepts_offsets_and_rejects_junk() {
    assert!(parse_rfc3339("2025-03-01T10:00:00Z").is_some());
    assert!(parse_rfc3339(" 2025-03-01T10:00:00+02:00 ").is_some());
    assert!(parse_rfc3339("yesterday").is_none());
    assert!(parse_rfc3339("").is_none());
  }

  #[test]
  fn trunc_respects_char_boundaries() {
    let s = "héllo wörld";
    let t = trunc_for_log(s, 2);
    assert!(t.starts_with('h'));
    assert!(t.contains("bytes total"));
  }
}
