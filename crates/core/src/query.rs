use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};
use crate::model::span::SpanRecord;

/// Threshold above which a request counts as slow for ad-hoc queries.
pub const DEFAULT_SLOW_THRESHOLD_MS: i64 = 1000;

/// Threshold the bottleneck analysis uses; tighter than the query default
/// so the analysis surfaces borderline endpoints too.
pub const DEFAULT_ANALYZE_SLOW_MS: i64 = 500;

/// Half-width of the related-traces time window.
pub const DEFAULT_RELATED_WINDOW_MS: i64 = 300_000;

/// Aggregates over a set of span records. Latency figures consider only
/// records with a recorded duration greater than zero; with none present
/// they are all zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TraceStats {
    pub total: usize,
    pub success: usize,
    pub error: usize,
    pub pending: usize,
    pub avg_duration_ms: i64,
    pub min_duration_ms: i64,
    pub max_duration_ms: i64,
}

/// Per-endpoint breakdown, keyed by the exact URL string. Path parameters
/// are not normalized: `/api/user/1` and `/api/user/2` are distinct buckets.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UrlStats {
    pub count: usize,
    pub total_duration_ms: i64,
    pub errors: usize,
    pub avg_duration_ms: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationKind {
    Performance,
    Reliability,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RecommendationSeverity {
    Medium,
    High,
}

/// Advisory output of the bottleneck analysis. Never an error condition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recommendation {
    pub kind: RecommendationKind,
    pub severity: RecommendationSeverity,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub slow: Vec<SpanRecord>,
    pub errors: Vec<SpanRecord>,
    pub url_stats: BTreeMap<String, UrlStats>,
    pub recommendations: Vec<Recommendation>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

impl FromStr for ExportFormat {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            _ => Err(TraceError::Parse(format!("unknown export format: {s}"))),
        }
    }
}
