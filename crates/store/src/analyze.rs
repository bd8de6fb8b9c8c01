use std::collections::BTreeMap;
use std::sync::Arc;

use reqtrace_core::model::span::SpanRecord;
use reqtrace_core::query::{
    DEFAULT_ANALYZE_SLOW_MS, PerformanceReport, Recommendation, RecommendationKind,
    RecommendationSeverity, UrlStats,
};

use crate::TraceStore;

const URL_ERROR_RATE_PCT: f64 = 10.0;
const URL_AVG_DURATION_MS: i64 = 1000;

/// Derives per-URL breakdowns and threshold-based recommendations from a
/// record set. Advisory output; this never fails.
pub fn analyze_records(records: &[Arc<SpanRecord>], slow_threshold_ms: i64) -> PerformanceReport {
    let slow: Vec<SpanRecord> = records
        .iter()
        .filter(|record| record.duration_ms.unwrap_or(0) > slow_threshold_ms)
        .map(|record| record.as_ref().clone())
        .collect();

    let errors: Vec<SpanRecord> = records
        .iter()
        .filter(|record| record.status.is_error())
        .map(|record| record.as_ref().clone())
        .collect();

    let mut url_stats: BTreeMap<String, UrlStats> = BTreeMap::new();
    for record in records {
        let entry = url_stats.entry(record.url.clone()).or_default();
        entry.count += 1;
        entry.total_duration_ms += record.duration_ms.unwrap_or(0);
        if record.status.is_error() {
            entry.errors += 1;
        }
    }
    for stats in url_stats.values_mut() {
        stats.avg_duration_ms =
            ((stats.total_duration_ms as f64) / (stats.count as f64)).round() as i64;
    }

    let recommendations = build_recommendations(&url_stats, &slow, slow_threshold_ms);

    PerformanceReport {
        slow,
        errors,
        url_stats,
        recommendations,
    }
}

fn build_recommendations(
    url_stats: &BTreeMap<String, UrlStats>,
    slow: &[SpanRecord],
    slow_threshold_ms: i64,
) -> Vec<Recommendation> {
    let mut out = Vec::new();

    if !slow.is_empty() {
        out.push(Recommendation {
            kind: RecommendationKind::Performance,
            severity: RecommendationSeverity::High,
            message: format!(
                "{} requests exceeded {slow_threshold_ms}ms; review the affected endpoints",
                slow.len()
            ),
        });
    }

    for (url, stats) in url_stats {
        let error_rate = (stats.errors as f64 / stats.count as f64) * 100.0;
        if error_rate > URL_ERROR_RATE_PCT {
            out.push(Recommendation {
                kind: RecommendationKind::Reliability,
                severity: RecommendationSeverity::High,
                message: format!(
                    "{url} failed {error_rate:.1}% of requests; check upstream stability"
                ),
            });
        }
    }

    for (url, stats) in url_stats {
        if stats.avg_duration_ms > URL_AVG_DURATION_MS {
            out.push(Recommendation {
                kind: RecommendationKind::Performance,
                severity: RecommendationSeverity::Medium,
                message: format!(
                    "{url} averages {}ms per request; consider caching or trimming the payload",
                    stats.avg_duration_ms
                ),
            });
        }
    }

    out
}

impl TraceStore {
    pub fn analyze(&self) -> PerformanceReport {
        analyze_records(&self.all(), DEFAULT_ANALYZE_SLOW_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_yields_empty_report() {
        let report = TraceStore::new().analyze();
        assert!(report.slow.is_empty());
        assert!(report.errors.is_empty());
        assert!(report.url_stats.is_empty());
        assert!(report.recommendations.is_empty());
    }

    #[test]
    fn high_error_rate_url_gets_a_reliability_recommendation() {
        let store = TraceStore::new();
        for i in 0..85 {
            store.insert(testkit::finalized("t", &format!("ok{i}"), "GET", "/api/orders", 200, 50));
        }
        for i in 0..15 {
            store.insert(testkit::finalized("t", &format!("err{i}"), "GET", "/api/orders", 502, 50));
        }

        let report = store.analyze();
        let reliability: Vec<&Recommendation> = report
            .recommendations
            .iter()
            .filter(|r| r.kind == RecommendationKind::Reliability)
            .collect();
        assert_eq!(reliability.len(), 1);
        assert_eq!(reliability[0].severity, RecommendationSeverity::High);
        assert!(reliability[0].message.contains("/api/orders"));
        assert!(reliability[0].message.contains("15.0%"));
    }

    #[test]
    fn slow_traces_raise_a_high_performance_recommendation() {
        let store = TraceStore::new();
        store.insert(testkit::finalized("t1", "s1", "GET", "/api/report", 200, 800));

        let report = store.analyze();
        assert_eq!(report.slow.len(), 1);
        assert_eq!(report.recommendations.len(), 1);
        assert_eq!(report.recommendations[0].kind, RecommendationKind::Performance);
        assert_eq!(report.recommendations[0].severity, RecommendationSeverity::High);
    }

    #[test]
    fn slow_average_url_gets_a_medium_performance_recommendation() {
        let store = TraceStore::new();
        store.insert(testkit::finalized("t1", "s1", "GET", "/api/export", 200, 1200));
        store.insert(testkit::finalized("t2", "s2", "GET", "/api/export", 200, 1400));

        let report = store.analyze();
        let medium: Vec<&Recommendation> = report
            .recommendations
            .iter()
            .filter(|r| r.severity == RecommendationSeverity::Medium)
            .collect();
        assert_eq!(medium.len(), 1);
        assert!(medium[0].message.contains("1300ms"));
    }

    #[test]
    fn url_buckets_are_exact_strings() {
        let store = TraceStore::new();
        store.insert(testkit::finalized("t1", "s1", "GET", "/api/user/1", 200, 10));
        store.insert(testkit::finalized("t2", "s2", "GET", "/api/user/2", 200, 10));

        let report = store.analyze();
        assert_eq!(report.url_stats.len(), 2);
        assert_eq!(report.url_stats["/api/user/1"].count, 1);
    }

    #[test]
    fn url_stats_accumulate_counts_durations_and_errors() {
        let store = TraceStore::new();
        store.insert(testkit::finalized("t1", "s1", "GET", "/api/items", 200, 100));
        store.insert(testkit::finalized("t2", "s2", "GET", "/api/items", 500, 300));

        let report = store.analyze();
        let stats = &report.url_stats["/api/items"];
        assert_eq!(stats.count, 2);
        assert_eq!(stats.total_duration_ms, 400);
        assert_eq!(stats.errors, 1);
        assert_eq!(stats.avg_duration_ms, 200);
    }
}
