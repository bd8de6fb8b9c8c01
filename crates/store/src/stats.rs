use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use reqtrace_core::model::span::SpanRecord;
use reqtrace_core::query::TraceStats;
use tracing::debug;

use crate::TraceStore;

/// Aggregates over any record set. Latency figures consider only records
/// with a recorded duration above zero; with none present they stay zero.
pub fn compute_stats(records: &[Arc<SpanRecord>]) -> TraceStats {
    let durations: Vec<i64> = records
        .iter()
        .filter_map(|record| record.duration_ms)
        .filter(|d| *d > 0)
        .collect();

    let avg_duration_ms = if durations.is_empty() {
        0
    } else {
        let sum: i64 = durations.iter().sum();
        ((sum as f64) / (durations.len() as f64)).round() as i64
    };

    TraceStats {
        total: records.len(),
        success: records.iter().filter(|r| r.status.is_success()).count(),
        error: records.iter().filter(|r| r.status.is_error()).count(),
        pending: records.iter().filter(|r| r.status.is_pending()).count(),
        avg_duration_ms,
        min_duration_ms: durations.iter().copied().min().unwrap_or(0),
        max_duration_ms: durations.iter().copied().max().unwrap_or(0),
    }
}

impl TraceStore {
    pub fn stats(&self) -> TraceStats {
        compute_stats(&self.all())
    }

    /// Walks caller-supplied parent links backward from the newest record of
    /// the given trace and returns the chain in root-to-leaf order. Links
    /// are not validated beyond lookup: a dangling parent ends the walk, and
    /// a link that revisits a record truncates it instead of looping.
    pub fn trace_chain(&self, trace_id: &str) -> Vec<Arc<SpanRecord>> {
        let Some(anchor) = self.find_by_trace_id(trace_id) else {
            return Vec::new();
        };

        let mut visited: HashSet<(String, String)> = HashSet::new();
        visited.insert((anchor.trace_id.clone(), anchor.span_id.clone()));

        let mut chain = vec![anchor.clone()];
        let mut current = anchor;
        while let Some(parent) = self.resolve_parent(&current) {
            let key = (parent.trace_id.clone(), parent.span_id.clone());
            if !visited.insert(key) {
                debug!(trace_id = %current.trace_id, "parent link cycle, truncating chain");
                break;
            }
            chain.push(parent.clone());
            current = parent;
        }

        chain.reverse();
        chain
    }

    /// Records of other traces whose start timestamp falls within the given
    /// window around this trace's record. A time heuristic, not causality.
    pub fn related_traces(&self, trace_id: &str, window_ms: i64) -> Vec<Arc<SpanRecord>> {
        let Some(anchor) = self.find_by_trace_id(trace_id) else {
            return Vec::new();
        };

        let since = anchor.start_ts - Duration::milliseconds(window_ms);
        let until = anchor.start_ts + Duration::milliseconds(window_ms);

        let mut records = self.all();
        records.retain(|record| {
            record.trace_id != anchor.trace_id
                && record.start_ts >= since
                && record.start_ts <= until
        });
        records
    }

    fn resolve_parent(&self, record: &SpanRecord) -> Option<Arc<SpanRecord>> {
        if let Some(parent_trace) = &record.parent_trace_id {
            if let Some(found) = self.find_by_trace_id(parent_trace) {
                return Some(found);
            }
        }
        if let Some(parent_span) = &record.parent_span_id {
            if let Some(found) = self.find_by_span_id(parent_span) {
                return Some(found);
            }
        }
        None
    }
}
