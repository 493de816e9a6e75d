//! Duration strings such as `"5m"`, `"1h"` or `"30d"`.

use crate::error::{CoreError, Result};

pub const NANOS_PER_SECOND: i64 = 1_000_000_000;
pub const NANOS_PER_MINUTE: i64 = 60 * NANOS_PER_SECOND;
pub const NANOS_PER_HOUR: i64 = 60 * NANOS_PER_MINUTE;
pub const NANOS_PER_DAY: i64 = 24 * NANOS_PER_HOUR;

/// Parse a duration string into nanoseconds.
///
/// Accepts an integer followed by one of `ns`, `us`/`µs`, `ms`, `s`, `m`,
/// `h`, `d` or `w`. A zero or negative number parses fine; callers that need
/// a positive duration check it themselves.
pub fn parse_duration(s: &str) -> Result<i64> {
    let s = s.trim();
    if s.is_empty() {
        return Err(CoreError::InvalidDuration("empty duration".to_string()));
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("ns") {
        (n, 1)
    } else if let Some(n) = s.strip_suffix("us").or_else(|| s.strip_suffix("µs")) {
        (n, 1_000)
    } else if let Some(n) = s.strip_suffix("ms") {
        (n, 1_000_000)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, NANOS_PER_SECOND)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, NANOS_PER_MINUTE)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, NANOS_PER_HOUR)
    } else if let Some(n) = s.strip_suffix('d') {
        (n, NANOS_PER_DAY)
    } else if let Some(n) = s.strip_suffix('w') {
        (n, 7 * NANOS_PER_DAY)
    } else {
        return Err(CoreError::InvalidDuration(format!("missing unit in {:?}", s)));
    };

    let num: i64 = num_str
        .trim()
        .parse()
        .map_err(|_| CoreError::InvalidDuration(format!("invalid number in {:?}", s)))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| CoreError::InvalidDuration(format!("{:?} overflows", s)))
}
