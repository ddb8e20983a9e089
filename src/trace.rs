use crate::env::TRACE_HEADER_ENV;
use std::sync::Arc;

/// Source of the raw trace propagation header, called at most once per
/// formatted record. Returns `None` when no trace is active.
pub type TraceIdProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Read the header from [`TRACE_HEADER_ENV`] on every call.
pub fn from_env() -> TraceIdProvider {
    Arc::new(|| std::env::var(TRACE_HEADER_ENV).ok())
}

/// Always yield the same header.
pub fn fixed(header: impl Into<String>) -> TraceIdProvider {
    let header = header.into();
    Arc::new(move || Some(header.clone()))
}

/// Never yield a header.
pub fn none() -> TraceIdProvider {
    Arc::new(|| None)
}

/// Extract the trace id from `Root=<trace-id>;Parent=...`.
///
/// Takes everything before the first `;` and strips a leading `Root=`.
/// Blank headers and blank ids yield `None`.
pub fn parse_trace_header(header: &str) -> Option<String> {
    let first = header.split(';').next().unwrap_or_default().trim();
    let id = first.strip_prefix("Root=").unwrap_or(first);
    if id.is_empty() {
        None
    } else {
        Some(id.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_root_segment() {
        assert_eq!(
            parse_trace_header("Root=1-5759e988-bd862e3fe1be46a994272793;Parent=53995c3f42cd8ad8;Sampled=1"),
            Some("1-5759e988-bd862e3fe1be46a994272793".to_string())
        );
    }

    #[test]
    fn header_without_prefix_or_separator_is_used_as_is() {
        assert_eq!(parse_trace_header("1-abc"), Some("1-abc".to_string()));
    }

    #[test]
    fn blank_values_yield_none() {
        assert_eq!(parse_trace_header(""), None);
        assert_eq!(parse_trace_header("Root=;Parent=1"), None);
        assert_eq!(parse_trace_header(";Parent=1"), None);
    }

    #[test]
    fn providers_yield_expected_headers() {
        assert_eq!(fixed("Root=x")(), Some("Root=x".to_string()));
        assert_eq!(none()(), None);
    }
}
