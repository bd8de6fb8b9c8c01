use std::sync::Arc;

use reqtrace_core::filter::TraceFilter;
use reqtrace_core::model::span::SpanRecord;

use crate::TraceStore;

impl TraceStore {
    /// Applies the filter to a snapshot, preserving store order. The empty
    /// filter returns exactly what `all()` returns.
    pub fn query(&self, filter: &TraceFilter) -> Vec<Arc<SpanRecord>> {
        let mut records = self.all();
        records.retain(|record| filter.matches(record));
        records
    }

    /// Records whose outcome was an HTTP status of 400+, or a transport
    /// failure.
    pub fn error_traces(&self) -> Vec<Arc<SpanRecord>> {
        let mut records = self.all();
        records.retain(|record| record.status.is_error());
        records
    }

    /// Records whose duration exceeded the threshold. Pending records never
    /// qualify.
    pub fn slow_traces(&self, threshold_ms: i64) -> Vec<Arc<SpanRecord>> {
        let mut records = self.all();
        records.retain(|record| record.duration_ms.unwrap_or(0) > threshold_ms);
        records
    }

    /// Newest record for the given trace id.
    pub fn find_by_trace_id(&self, trace_id: &str) -> Option<Arc<SpanRecord>> {
        self.all()
            .into_iter()
            .find(|record| record.trace_id == trace_id)
    }

    /// Newest record for the given span id.
    pub fn find_by_span_id(&self, span_id: &str) -> Option<Arc<SpanRecord>> {
        self.all()
            .into_iter()
            .find(|record| record.span_id == span_id)
    }

    pub fn find_by_url(&self, fragment: &str) -> Vec<Arc<SpanRecord>> {
        let mut records = self.all();
        records.retain(|record| record.url.contains(fragment));
        records
    }
}
