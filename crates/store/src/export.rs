use std::sync::Arc;

use chrono::SecondsFormat;
use reqtrace_core::error::{Result, TraceError};
use reqtrace_core::model::span::SpanRecord;
use reqtrace_core::query::ExportFormat;

use crate::TraceStore;

const CSV_COLUMNS: [&str; 7] = [
    "Method",
    "URL",
    "Status",
    "Duration",
    "Trace ID",
    "Timestamp",
    "Error",
];

impl TraceStore {
    /// Serializes the current snapshot. CSV output is one quoted row per
    /// record in the documented column order, preceded by a header row; an
    /// empty store exports as an empty string.
    pub fn export(&self, format: ExportFormat) -> Result<String> {
        let records = self.all();
        match format {
            ExportFormat::Json => {
                let plain: Vec<&SpanRecord> = records.iter().map(Arc::as_ref).collect();
                serde_json::to_string_pretty(&plain)
                    .map_err(|e| TraceError::Export(format!("json export failed: {e}")))
            }
            ExportFormat::Csv => Ok(to_csv(&records)),
        }
    }
}

fn to_csv(records: &[Arc<SpanRecord>]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(
        CSV_COLUMNS
            .iter()
            .map(|column| quote(column))
            .collect::<Vec<_>>()
            .join(","),
    );

    for record in records {
        let status = record.status.to_string();
        let duration = record
            .duration_ms
            .map(|d| d.to_string())
            .unwrap_or_default();
        let timestamp = record.start_ts.to_rfc3339_opts(SecondsFormat::Millis, true);
        let row = [
            record.method.as_str(),
            record.url.as_str(),
            status.as_str(),
            duration.as_str(),
            record.trace_id.as_str(),
            timestamp.as_str(),
            record.error.as_deref().unwrap_or(""),
        ];
        lines.push(
            row.iter()
                .map(|field| quote(field))
                .collect::<Vec<_>>()
                .join(","),
        );
    }

    lines.join("\n")
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}
