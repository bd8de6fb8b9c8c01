use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Outcome of a span. `Pending` while the request is in flight, then either
/// the numeric HTTP status or `Error` for a transport-level failure that
/// never produced a status line.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpanStatus {
    Pending,
    Http(u16),
    Error,
}

impl SpanStatus {
    pub fn is_pending(self) -> bool {
        matches!(self, Self::Pending)
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Http(code) if (200..300).contains(&code))
    }

    /// An HTTP status of 400 or above, or a transport failure.
    pub fn is_error(self) -> bool {
        match self {
            Self::Http(code) => code >= 400,
            Self::Error => true,
            Self::Pending => false,
        }
    }
}

impl fmt::Display for SpanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Http(code) => write!(f, "{code}"),
            Self::Error => f.write_str("error"),
        }
    }
}

/// One recorded request hop. `duration_ms` is `None` exactly while the
/// status is `Pending`; once finalized the record is never mutated again.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpanRecord {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub parent_trace_id: Option<String>,
    pub method: String,
    pub url: String,
    pub start_ts: DateTime<Utc>,
    pub status: SpanStatus,
    pub duration_ms: Option<i64>,
    pub request_headers: Vec<(String, String)>,
    pub response_size: Option<u64>,
    pub error: Option<String>,
}

impl SpanRecord {
    pub fn is_finalized(&self) -> bool {
        !self.status.is_pending()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_predicates() {
        assert!(SpanStatus::Http(204).is_success());
        assert!(!SpanStatus::Http(301).is_success());
        assert!(SpanStatus::Http(404).is_error());
        assert!(SpanStatus::Error.is_error());
        assert!(!SpanStatus::Pending.is_error());
        assert!(SpanStatus::Pending.is_pending());
    }

    #[test]
    fn status_renders_for_export() {
        assert_eq!(SpanStatus::Pending.to_string(), "pending");
        assert_eq!(SpanStatus::Http(503).to_string(), "503");
        assert_eq!(SpanStatus::Error.to_string(), "error");
    }
}
