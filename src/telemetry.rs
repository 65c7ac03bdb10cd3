//! Logging setup and W3C trace-context propagation.
//!
//! Tracer and meter providers are not configured here. The only tracing
//! concern carried through the webhook core is the inbound request's
//! `traceparent` / `tracestate`, which is forwarded to outbound reply calls.

use axum::http::HeaderMap;
use opentelemetry::propagation::{Extractor, Injector, TextMapPropagator};
use opentelemetry::trace::TraceContextExt;
use opentelemetry_sdk::propagation::TraceContextPropagator;

/// Install the global `tracing` subscriber.
///
/// Filter comes from `RUST_LOG`, then `LOG_LEVEL`, then `info`.
/// `LOG_FORMAT=json` switches to JSON lines.
pub fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| {
            tracing_subscriber::EnvFilter::try_new(
                std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            )
        })
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    }
}

/// Install the W3C Trace Context propagator as the global text-map propagator.
pub fn install_propagator() {
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
}

/// Trace context of one inbound delivery, handed to the outbound reply call.
#[derive(Debug, Clone, Default)]
pub struct TraceContext {
    context: opentelemetry::Context,
}

impl TraceContext {
    /// A context with no remote parent.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Extract the remote parent from inbound HTTP headers.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let context = TraceContextPropagator::new().extract(&HeaderExtractor(headers));
        Self { context }
    }

    /// Whether an inbound `traceparent` was found.
    pub fn is_remote(&self) -> bool {
        self.context.span().span_context().is_valid()
    }

    /// Trace id as lowercase hex, if present.
    pub fn trace_id(&self) -> Option<String> {
        let span = self.context.span();
        let span_context = span.span_context();
        span_context
            .is_valid()
            .then(|| span_context.trace_id().to_string())
    }

    /// Headers to attach to an outbound request to continue this trace.
    pub fn outbound_headers(&self) -> Vec<(String, String)> {
        let mut injector = PairInjector::default();
        opentelemetry::global::get_text_map_propagator(|propagator| {
            propagator.inject_context(&self.context, &mut injector);
        });
        // Fall back to W3C directly when no global propagator is installed.
        if injector.0.is_empty() {
            TraceContextPropagator::new().inject_context(&self.context, &mut injector);
        }
        injector.0
    }
}

/// Extractor over an `http::HeaderMap`.
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Injector collecting header pairs, independent of the HTTP client's types.
#[derive(Default)]
struct PairInjector(Vec<(String, String)>);

impl Injector for PairInjector {
    fn set(&mut self, key: &str, value: String) {
        self.0.push((key.to_string(), value));
    }
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    const TRACEPARENT: &str = "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01";

    #[test]
    fn extracts_traceparent() {
        let mut headers = HeaderMap::new();
        headers.insert("traceparent", HeaderValue::from_static(TRACEPARENT));

        let ctx = TraceContext::from_headers(&headers);
        assert!(ctx.is_remote());
        assert_eq!(
            ctx.trace_id().as_deref(),
            Some("0af7651916cd43dd8448eb211c80319c")
        );
    }

    #[test]
    fn empty_headers_yield_no_parent() {
        let ctx = TraceContext::from_headers(&HeaderMap::new());
        assert!(!ctx.is_remote());
        assert!(ctx.trace_id().is_none());
        assert!(ctx.outbound_headers().is_empty());
    }

    #[test]
    fn malformed_traceparent_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert("traceparent", HeaderValue::from_static("not-a-trace"));
        assert!(!TraceContext::from_headers(&headers).is_remote());
    }

    #[test]
    fn outbound_headers_continue_the_trace() {
        let mut headers = HeaderMap::new();
        headers.insert("traceparent", HeaderValue::from_static(TRACEPARENT));

        let out = TraceContext::from_headers(&headers).outbound_headers();
        let traceparent = out
            .iter()
            .find(|(k, _)| k == "traceparent")
            .map(|(_, v)| v.as_str())
            .expect("traceparent injected");
        assert!(traceparent.contains("0af7651916cd43dd8448eb211c80319c"));
    }
}
