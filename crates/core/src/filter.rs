use chrono::{DateTime, Utc};
use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};
use crate::model::span::{SpanRecord, SpanStatus};
use crate::time::parse_time_or_relative;

/// Inclusive timestamp bounds; either side may be open.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TimeWindow {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TimeWindow {
    pub fn all() -> Self {
        Self::default()
    }

    /// Bounds given as RFC3339 timestamps or relative ages such as "15m".
    pub fn parse(since: Option<&str>, until: Option<&str>) -> Result<Self> {
        Ok(Self {
            since: since.map(parse_time_or_relative).transpose()?,
            until: until.map(parse_time_or_relative).transpose()?,
        })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        if let Some(since) = self.since {
            if ts < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if ts > until {
                return false;
            }
        }
        true
    }
}

/// Matches one recorded request header by name (case-insensitive) against a
/// glob over its value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeaderFilter {
    pub name: String,
    pub value_glob: String,
}

impl HeaderFilter {
    pub fn parse(input: &str) -> Result<Self> {
        let (name, value_glob) = input
            .split_once('=')
            .ok_or_else(|| TraceError::Parse(format!("invalid header filter: {input}")))?;

        if name.trim().is_empty() || value_glob.trim().is_empty() {
            return Err(TraceError::Parse(format!("invalid header filter: {input}")));
        }

        Ok(Self {
            name: name.trim().to_string(),
            value_glob: value_glob.trim().to_string(),
        })
    }

    pub fn matches(&self, headers: &[(String, String)]) -> bool {
        let Ok(pattern) = Pattern::new(&self.value_glob) else {
            return false;
        };
        headers
            .iter()
            .any(|(name, value)| name.eq_ignore_ascii_case(&self.name) && pattern.matches(value))
    }
}

/// Structured query over stored span records. Every field is independently
/// optional and the present ones are ANDed; the default filter matches
/// everything. Duration bounds only ever match records that have a recorded
/// duration, so any duration bound excludes pending records.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceFilter {
    pub method: Option<String>,
    pub url_contains: Option<String>,
    pub status: Option<SpanStatus>,
    pub trace_id: Option<String>,
    pub min_duration_ms: Option<i64>,
    pub max_duration_ms: Option<i64>,
    pub window: TimeWindow,
    pub header: Option<HeaderFilter>,
}

impl TraceFilter {
    pub fn matches(&self, record: &SpanRecord) -> bool {
        if let Some(method) = &self.method {
            if !record.method.eq_ignore_ascii_case(method) {
                return false;
            }
        }
        if let Some(fragment) = &self.url_contains {
            if !record.url.contains(fragment.as_str()) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if record.status != status {
                return false;
            }
        }
        if let Some(trace_id) = &self.trace_id {
            if record.trace_id != *trace_id {
                return false;
            }
        }
        if let Some(min) = self.min_duration_ms {
            match record.duration_ms {
                Some(d) if d >= min => {}
                _ => return false,
            }
        }
        if let Some(max) = self.max_duration_ms {
            match record.duration_ms {
                Some(d) if d <= max => {}
                _ => return false,
            }
        }
        if !self.window.contains(record.start_ts) {
            return false;
        }
        if let Some(header) = &self.header {
            if !header.matches(&record.request_headers) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn record() -> SpanRecord {
        SpanRecord {
            trace_id: "t1".to_string(),
            span_id: "s1".to_string(),
            parent_span_id: None,
            parent_trace_id: None,
            method: "GET".to_string(),
            url: "/api/orders/42".to_string(),
            start_ts: Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap(),
            status: SpanStatus::Http(200),
            duration_ms: Some(120),
            request_headers: vec![("x-tenant".to_string(), "acme-dev".to_string())],
            response_size: Some(64),
            error: None,
        }
    }

    #[test]
    fn default_filter_matches_everything() {
        assert!(TraceFilter::default().matches(&record()));
    }

    #[test]
    fn method_match_is_case_insensitive() {
        let filter = TraceFilter {
            method: Some("get".to_string()),
            ..TraceFilter::default()
        };
        assert!(filter.matches(&record()));
    }

    #[test]
    fn duration_bounds_are_inclusive_and_exclude_pending() {
        let filter = TraceFilter {
            min_duration_ms: Some(120),
            max_duration_ms: Some(120),
            ..TraceFilter::default()
        };
        assert!(filter.matches(&record()));

        let mut pending = record();
        pending.status = SpanStatus::Pending;
        pending.duration_ms = None;
        assert!(!filter.matches(&pending));
    }

    #[test]
    fn window_parses_mixed_bounds() {
        let window = TimeWindow::parse(Some("15m"), Some("2026-02-01T00:00:00Z")).unwrap();
        assert!(window.since.is_some());
        assert_eq!(
            window.until.unwrap().to_rfc3339(),
            "2026-02-01T00:00:00+00:00"
        );
        assert!(TimeWindow::parse(Some("whenever"), None).is_err());
    }

    #[test]
    fn window_bounds_are_inclusive() {
        let ts = record().start_ts;
        let window = TimeWindow {
            since: Some(ts),
            until: Some(ts),
        };
        assert!(window.contains(ts));
        assert!(!window.contains(ts + chrono::Duration::milliseconds(1)));
    }

    #[test]
    fn status_filter_is_exact() {
        let filter = TraceFilter {
            status: Some(SpanStatus::Http(404)),
            ..TraceFilter::default()
        };
        assert!(!filter.matches(&record()));
    }

    #[test]
    fn header_filter_parse_and_match() {
        let filter = HeaderFilter::parse("X-Tenant=acme-*").unwrap();
        assert_eq!(filter.name, "X-Tenant");
        assert!(filter.matches(&record().request_headers));
        assert!(!filter.matches(&[("x-tenant".to_string(), "globex".to_string())]));
        assert!(HeaderFilter::parse("no-separator").is_err());
    }
}
