use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::{Result, TraceError};

/// Accepts an RFC3339 timestamp or a relative age such as "15m" (meaning
/// that long before now).
pub fn parse_time_or_relative(input: &str) -> Result<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(input) {
        return Ok(ts.with_timezone(&Utc));
    }

    let age = humantime::parse_duration(input).map_err(|e| {
        TraceError::Parse(format!("expected RFC3339 time or duration, got {input}: {e}"))
    })?;
    let age = chrono::Duration::from_std(age)
        .map_err(|e| TraceError::Internal(format!("duration out of range: {e}")))?;
    Ok(Utc::now() - age)
}

pub fn parse_duration_str(input: &str) -> Result<Duration> {
    humantime::parse_duration(input)
        .map_err(|e| TraceError::Parse(format!("invalid duration {input}: {e}")))
}
