use regex::Regex;
use reqtrace_core::config::TraceConfig;
use tracing::warn;

pub const REDACTED: &str = "[REDACTED]";

/// Injected policy seam: decides whether a request is traced at all and
/// scrubs its headers before they are recorded. The lifecycle consumes the
/// decisions; it never evaluates policy content itself.
pub trait TracePolicy: Send + Sync {
    fn should_trace(&self, method: &str, url: &str) -> bool;

    fn redact(&self, headers: &[(String, String)]) -> Vec<(String, String)>;
}

/// Config-driven policy: an enabled switch, ignored URL fragments, ignored
/// URL regexes, and a sensitive-header list whose values are replaced with
/// `[REDACTED]`.
pub struct ConfigPolicy {
    enabled: bool,
    ignored_urls: Vec<String>,
    ignored_patterns: Vec<Regex>,
    sensitive_headers: Vec<String>,
}

impl ConfigPolicy {
    pub fn from_config(cfg: &TraceConfig) -> Self {
        let ignored_patterns = cfg
            .ignored_url_patterns
            .iter()
            .filter_map(|raw| match Regex::new(raw) {
                Ok(pattern) => Some(pattern),
                Err(e) => {
                    warn!(pattern = %raw, error = %e, "skipping invalid ignored-url pattern");
                    None
                }
            })
            .collect();

        Self {
            enabled: cfg.enabled,
            ignored_urls: cfg.ignored_urls.clone(),
            ignored_patterns,
            sensitive_headers: cfg
                .sensitive_headers
                .iter()
                .map(|header| header.to_ascii_lowercase())
                .collect(),
        }
    }
}

impl TracePolicy for ConfigPolicy {
    fn should_trace(&self, _method: &str, url: &str) -> bool {
        if !self.enabled {
            return false;
        }
        if self.ignored_urls.iter().any(|fragment| url.contains(fragment)) {
            return false;
        }
        !self.ignored_patterns.iter().any(|pattern| pattern.is_match(url))
    }

    fn redact(&self, headers: &[(String, String)]) -> Vec<(String, String)> {
        headers
            .iter()
            .map(|(name, value)| {
                let sensitive = self
                    .sensitive_headers
                    .iter()
                    .any(|header| name.eq_ignore_ascii_case(header));
                if sensitive {
                    (name.clone(), REDACTED.to_string())
                } else {
                    (name.clone(), value.clone())
                }
            })
            .collect()
    }
}

impl Default for ConfigPolicy {
    fn default() -> Self {
        Self::from_config(&TraceConfig::default())
    }
}
