use chrono::{DateTime, Duration, TimeZone, Utc};
use reqtrace_core::model::span::{SpanRecord, SpanStatus};
use tracing_subscriber::EnvFilter;

/// Installs a compact subscriber for integration tests; repeated calls are
/// harmless.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .try_init();
}

pub fn base_ts() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 1, 0, 0, 0).unwrap()
}

pub fn finalized(
    trace_id: &str,
    span_id: &str,
    method: &str,
    url: &str,
    status: u16,
    duration_ms: i64,
) -> SpanRecord {
    SpanRecord {
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        parent_span_id: None,
        parent_trace_id: None,
        method: method.to_string(),
        url: url.to_string(),
        start_ts: base_ts(),
        status: SpanStatus::Http(status),
        duration_ms: Some(duration_ms),
        request_headers: vec![("accept".to_string(), "application/json".to_string())],
        response_size: Some(256),
        error: None,
    }
}

pub fn failed(trace_id: &str, span_id: &str, method: &str, url: &str, error: &str) -> SpanRecord {
    SpanRecord {
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        parent_span_id: None,
        parent_trace_id: None,
        method: method.to_string(),
        url: url.to_string(),
        start_ts: base_ts(),
        status: SpanStatus::Error,
        duration_ms: Some(5),
        request_headers: Vec::new(),
        response_size: None,
        error: Some(error.to_string()),
    }
}

pub fn pending(trace_id: &str, span_id: &str, method: &str, url: &str) -> SpanRecord {
    SpanRecord {
        trace_id: trace_id.to_string(),
        span_id: span_id.to_string(),
        parent_span_id: None,
        parent_trace_id: None,
        method: method.to_string(),
        url: url.to_string(),
        start_ts: base_ts(),
        status: SpanStatus::Pending,
        duration_ms: None,
        request_headers: Vec::new(),
        response_size: None,
        error: None,
    }
}

/// A root record and a child record in a second trace whose parent links
/// point back at the root.
pub fn sample_chain() -> (SpanRecord, SpanRecord) {
    let root = finalized("t-root", "s-root", "GET", "/v1/orders", 200, 1800);
    let mut child = finalized("t-child", "s-child", "GET", "/v1/orders/42", 200, 700);
    child.parent_trace_id = Some(root.trace_id.clone());
    child.parent_span_id = Some(root.span_id.clone());
    child.start_ts = base_ts() + Duration::milliseconds(900);
    (root, child)
}
