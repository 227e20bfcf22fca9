//! Best-effort normalization of user-entered time strings.
//!
//! The PI Web API accepts both absolute timestamps and its own relative
//! syntax (`*`, `*-1d`, `t+8h`). Absolute inputs in common shapes are
//! normalized to RFC 3339 so the server never has to guess a locale;
//! anything unrecognized passes through untouched.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

const DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

/// Normalize `input` to RFC 3339 when it parses as an absolute time.
pub fn normalize(input: &str) -> String {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return dt.to_rfc3339();
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return dt.format("%Y-%m-%dT%H:%M:%S").to_string();
        }
    }
    for format in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, format) {
            return d.and_time(NaiveTime::MIN).format("%Y-%m-%dT%H:%M:%S").to_string();
        }
    }

    input.to_string()
}
