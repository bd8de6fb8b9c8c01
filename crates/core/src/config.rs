use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TraceError};
use crate::time::parse_duration_str;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceConfig {
    pub enabled: bool,
    pub max_traces: usize,
    pub slow_threshold: Duration,
    pub related_window: Duration,
    pub trace_id_header: String,
    pub span_id_header: String,
    pub parent_span_id_header: String,
    pub ignored_urls: Vec<String>,
    pub ignored_url_patterns: Vec<String>,
    pub sensitive_headers: Vec<String>,
}

impl Default for TraceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_traces: 1000,
            slow_threshold: Duration::from_millis(1000),
            related_window: Duration::from_secs(300),
            trace_id_header: "X-Trace-Id".to_string(),
            span_id_header: "X-Span-Id".to_string(),
            parent_span_id_header: "X-Parent-Span-Id".to_string(),
            ignored_urls: vec![
                "/health".to_string(),
                "/ping".to_string(),
                "/favicon.ico".to_string(),
            ],
            ignored_url_patterns: vec![
                r"\.(css|js|png|jpg|jpeg|gif|svg|woff|woff2|ttf|eot)$".to_string(),
            ],
            sensitive_headers: vec![
                "authorization".to_string(),
                "cookie".to_string(),
                "x-token".to_string(),
                "x-api-key".to_string(),
            ],
        }
    }
}

impl TraceConfig {
    pub fn load() -> Result<Self> {
        let mut cfg = Self::default();
        let config_path = config_file_path();
        if let Some(file_overrides) = load_file_overrides(&config_path)? {
            apply_overrides(&mut cfg, file_overrides, "config file")?;
        }
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }

    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        let env_overrides = load_env_overrides()?;
        apply_overrides(&mut cfg, env_overrides, "environment")?;
        Ok(cfg)
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigOverrides {
    enabled: Option<bool>,
    max_traces: Option<usize>,
    slow_threshold: Option<String>,
    related_window: Option<String>,
    trace_id_header: Option<String>,
    span_id_header: Option<String>,
    parent_span_id_header: Option<String>,
    ignored_urls: Option<String>,
    ignored_url_patterns: Option<String>,
    sensitive_headers: Option<String>,
}

fn config_file_path() -> PathBuf {
    if let Ok(path) = env::var("REQTRACE_CONFIG") {
        return PathBuf::from(path);
    }

    let home = env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let config_home = env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(home).join(".config"));
    config_home.join("reqtrace/config.toml")
}

fn load_file_overrides(path: &PathBuf) -> Result<Option<ConfigOverrides>> {
    if !path.exists() {
        return Ok(None);
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| TraceError::Config(format!("failed reading {}: {e}", path.display())))?;
    let parsed: ConfigOverrides = toml::from_str(&raw)
        .map_err(|e| TraceError::Config(format!("failed parsing {}: {e}", path.display())))?;
    Ok(Some(parsed))
}

fn load_env_overrides() -> Result<ConfigOverrides> {
    let enabled = match env::var("REQTRACE_ENABLED") {
        Ok(v) => Some(parse_bool(&v).ok_or_else(|| {
            TraceError::Config(format!("bad REQTRACE_ENABLED in environment (value={v})"))
        })?),
        Err(_) => None,
    };

    let max_traces = match env::var("REQTRACE_MAX_TRACES") {
        Ok(v) => Some(v.parse::<usize>().map_err(|e| {
            TraceError::Config(format!("bad REQTRACE_MAX_TRACES in environment: {e}"))
        })?),
        Err(_) => None,
    };

    Ok(ConfigOverrides {
        enabled,
        max_traces,
        slow_threshold: env::var("REQTRACE_SLOW_THRESHOLD").ok(),
        related_window: env::var("REQTRACE_RELATED_WINDOW").ok(),
        trace_id_header: env::var("REQTRACE_TRACE_ID_HEADER").ok(),
        span_id_header: env::var("REQTRACE_SPAN_ID_HEADER").ok(),
        parent_span_id_header: env::var("REQTRACE_PARENT_SPAN_ID_HEADER").ok(),
        ignored_urls: env::var("REQTRACE_IGNORED_URLS").ok(),
        ignored_url_patterns: env::var("REQTRACE_IGNORED_URL_PATTERNS").ok(),
        sensitive_headers: env::var("REQTRACE_SENSITIVE_HEADERS").ok(),
    })
}

fn apply_overrides(cfg: &mut TraceConfig, overrides: ConfigOverrides, source: &str) -> Result<()> {
    if let Some(v) = overrides.enabled {
        cfg.enabled = v;
    }
    if let Some(v) = overrides.max_traces {
        cfg.max_traces = v;
    }
    if let Some(v) = overrides.slow_threshold {
        cfg.slow_threshold = parse_duration_str(&v).map_err(|e| {
            TraceError::Config(format!("bad slow_threshold in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.related_window {
        cfg.related_window = parse_duration_str(&v).map_err(|e| {
            TraceError::Config(format!("bad related_window in {source}: {e} (value={v})"))
        })?;
    }
    if let Some(v) = overrides.trace_id_header {
        cfg.trace_id_header = v;
    }
    if let Some(v) = overrides.span_id_header {
        cfg.span_id_header = v;
    }
    if let Some(v) = overrides.parent_span_id_header {
        cfg.parent_span_id_header = v;
    }
    if let Some(v) = overrides.ignored_urls {
        cfg.ignored_urls = parse_list(&v);
    }
    if let Some(v) = overrides.ignored_url_patterns {
        cfg.ignored_url_patterns = parse_list(&v);
    }
    if let Some(v) = overrides.sensitive_headers {
        cfg.sensitive_headers = parse_list(&v);
    }
    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
