use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use chrono::Utc;
use reqtrace_core::ids::{SpanId, TraceId};
use reqtrace_core::model::span::{SpanRecord, SpanStatus};
use reqtrace_store::TraceStore;
use tracing::{debug, warn};

use crate::policy::TracePolicy;
use crate::propagation::{HeaderNames, TraceContext};

/// Opaque ticket for one in-flight request, issued at open and consumed by
/// the matching close. Handles are never reused, so two concurrent requests
/// to the same endpoint cannot collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanHandle(u64);

/// Caller-supplied parameters for opening a span. Headers are recorded as
/// given; redact them first (`start_request` does).
#[derive(Debug, Clone)]
pub struct SpanStart {
    pub method: String,
    pub url: String,
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
    pub parent_trace_id: Option<String>,
    pub request_headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct StartedRequest {
    pub handle: SpanHandle,
    pub context: TraceContext,
}

struct OpenSpan {
    record: SpanRecord,
    started: Instant,
}

struct Inner {
    store: TraceStore,
    policy: Box<dyn TracePolicy>,
    headers: HeaderNames,
    active: Mutex<HashMap<SpanHandle, OpenSpan>>,
    next_handle: AtomicU64,
}

/// Tracks the lifecycle of in-flight request spans and emits finalized
/// records to the trace store. Cheap to clone; clones share the registry.
///
/// A span that is never closed stays in the registry: always close on every
/// exit path, success or failure.
#[derive(Clone)]
pub struct RequestTracer {
    inner: Arc<Inner>,
}

impl RequestTracer {
    pub fn new(store: TraceStore, policy: impl TracePolicy + 'static, headers: HeaderNames) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                policy: Box::new(policy),
                headers,
                active: Mutex::new(HashMap::new()),
                next_handle: AtomicU64::new(1),
            }),
        }
    }

    pub fn store(&self) -> &TraceStore {
        &self.inner.store
    }

    pub fn header_names(&self) -> &HeaderNames {
        &self.inner.headers
    }

    /// Policy-gated entry point for an outgoing request: decides whether to
    /// trace, generates identifiers, redacts the headers, and opens the
    /// span. Returns `None` when policy declines.
    pub fn start_request(
        &self,
        method: &str,
        url: &str,
        request_headers: &[(String, String)],
        parent: Option<&TraceContext>,
    ) -> Option<StartedRequest> {
        if !self.inner.policy.should_trace(method, url) {
            return None;
        }

        let context = TraceContext {
            trace_id: TraceId::generate().into(),
            span_id: SpanId::generate().into(),
            parent_span_id: parent.map(|p| p.span_id.clone()),
        };

        let handle = self.open_span(SpanStart {
            method: method.to_string(),
            url: url.to_string(),
            trace_id: context.trace_id.clone(),
            span_id: context.span_id.clone(),
            parent_span_id: context.parent_span_id.clone(),
            parent_trace_id: parent.map(|p| p.trace_id.clone()),
            request_headers: self.inner.policy.redact(request_headers),
        });

        Some(StartedRequest { handle, context })
    }

    /// Opens a span with caller-supplied identifiers. The pending record
    /// keeps the wall-clock start; duration is measured against a monotonic
    /// instant retained alongside.
    pub fn open_span(&self, start: SpanStart) -> SpanHandle {
        let handle = SpanHandle(self.inner.next_handle.fetch_add(1, Ordering::Relaxed));
        let record = SpanRecord {
            trace_id: start.trace_id,
            span_id: start.span_id,
            parent_span_id: start.parent_span_id,
            parent_trace_id: start.parent_trace_id,
            method: start.method,
            url: start.url,
            start_ts: Utc::now(),
            status: SpanStatus::Pending,
            duration_ms: None,
            request_headers: start.request_headers,
            response_size: None,
            error: None,
        };

        debug!(method = %record.method, url = %record.url, trace_id = %record.trace_id, "span opened");

        self.active().insert(
            handle,
            OpenSpan {
                record,
                started: Instant::now(),
            },
        );
        handle
    }

    /// Finalizes the span with an HTTP status and emits it to the store.
    /// A handle with no open span is a logged no-op, so a duplicate close
    /// never crashes the request path and never emits a second record.
    pub fn close_ok(&self, handle: SpanHandle, status_code: u16, response_size: Option<u64>) {
        let Some(open) = self.take(handle, "close_ok") else {
            return;
        };

        let mut record = open.record;
        record.status = SpanStatus::Http(status_code);
        record.duration_ms = Some(elapsed_ms(open.started));
        record.response_size = response_size;

        debug!(
            method = %record.method,
            url = %record.url,
            status = status_code,
            duration_ms = record.duration_ms.unwrap_or(0),
            "span closed"
        );
        self.inner.store.insert(record);
    }

    /// Finalizes the span as a transport failure. Same no-op contract as
    /// `close_ok` for unknown handles.
    pub fn close_error(&self, handle: SpanHandle, message: &str) {
        let Some(open) = self.take(handle, "close_error") else {
            return;
        };

        let mut record = open.record;
        record.status = SpanStatus::Error;
        record.duration_ms = Some(elapsed_ms(open.started));
        record.error = Some(message.to_string());

        debug!(
            method = %record.method,
            url = %record.url,
            error = message,
            duration_ms = record.duration_ms.unwrap_or(0),
            "span closed with error"
        );
        self.inner.store.insert(record);
    }

    /// Snapshot of a still-open span, if the handle is live.
    pub fn pending(&self, handle: SpanHandle) -> Option<SpanRecord> {
        self.active().get(&handle).map(|open| open.record.clone())
    }

    pub fn active_count(&self) -> usize {
        self.active().len()
    }

    fn take(&self, handle: SpanHandle, operation: &str) -> Option<OpenSpan> {
        let taken = self.active().remove(&handle);
        if taken.is_none() {
            warn!(operation, "no active span for handle, ignoring close");
        }
        taken
    }

    fn active(&self) -> MutexGuard<'_, HashMap<SpanHandle, OpenSpan>> {
        self.inner.active.lock().expect("active span registry poisoned")
    }
}

fn elapsed_ms(started: Instant) -> i64 {
    i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX)
}
