use reqtrace_core::config::TraceConfig;
use reqtrace_core::ids::{SpanId, TraceId};

/// Identifiers a transport attaches to one outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceContext {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: Option<String>,
}

/// The header names trace context travels under. The transport owns
/// attaching and reading the headers; this type owns their names and the
/// shape of their values.
#[derive(Debug, Clone)]
pub struct HeaderNames {
    pub trace_id: String,
    pub span_id: String,
    pub parent_span_id: String,
}

impl HeaderNames {
    pub fn from_config(cfg: &TraceConfig) -> Self {
        Self {
            trace_id: cfg.trace_id_header.clone(),
            span_id: cfg.span_id_header.clone(),
            parent_span_id: cfg.parent_span_id_header.clone(),
        }
    }

    /// Header pairs for an outgoing request. The parent header is only
    /// present when the context has a parent.
    pub fn inject(&self, ctx: &TraceContext) -> Vec<(String, String)> {
        let mut headers = vec![
            (self.trace_id.clone(), ctx.trace_id.clone()),
            (self.span_id.clone(), ctx.span_id.clone()),
        ];
        if let Some(parent) = &ctx.parent_span_id {
            headers.push((self.parent_span_id.clone(), parent.clone()));
        }
        headers
    }

    /// Reads and validates inbound context headers. Returns `None` when the
    /// trace or span header is absent or malformed; a malformed parent
    /// header is dropped rather than failing the whole context.
    pub fn extract(&self, headers: &[(String, String)]) -> Option<TraceContext> {
        let trace_id = TraceId::parse(self.value(headers, &self.trace_id)?).ok()?;
        let span_id = SpanId::parse(self.value(headers, &self.span_id)?).ok()?;
        let parent_span_id = self
            .value(headers, &self.parent_span_id)
            .and_then(|v| SpanId::parse(v).ok())
            .map(String::from);

        Some(TraceContext {
            trace_id: trace_id.into(),
            span_id: span_id.into(),
            parent_span_id,
        })
    }

    fn value<'a>(&self, headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
        headers
            .iter()
            .find(|(header, _)| header.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

impl Default for HeaderNames {
    fn default() -> Self {
        Self::from_config(&TraceConfig::default())
    }
}
