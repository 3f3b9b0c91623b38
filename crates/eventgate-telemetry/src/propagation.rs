//! W3C trace-context carrier helpers.
//!
//! The gateway injects the active span context into log record headers and
//! the processor extracts it, so the distributed trace survives the
//! asynchronous hop.

use std::collections::HashMap;

use opentelemetry::Context;
use opentelemetry::propagation::{Extractor, Injector};
use opentelemetry::trace::TraceContextExt;
use tracing_opentelemetry::OpenTelemetrySpanExt;

/// Text-map carrier over plain string pairs, usable for HTTP headers and
/// log record headers alike.
#[derive(Debug, Default)]
pub struct HeaderCarrier(HashMap<String, String>);

impl HeaderCarrier {
    /// Creates an empty carrier.
    #[must_use]
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Builds a carrier from decoded header pairs.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        Self(pairs.into_iter().collect())
    }

    /// Iterates the carried pairs, for writing into transport headers.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl Injector for HeaderCarrier {
    fn set(&mut self, key: &str, value: String) {
        self.0.insert(key.to_owned(), value);
    }
}

impl Extractor for HeaderCarrier {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

/// Injects the current span's context into a fresh carrier.
#[must_use]
pub fn inject_current_context() -> HeaderCarrier {
    let mut carrier = HeaderCarrier::new();
    let context = tracing::Span::current().context();
    opentelemetry::global::get_text_map_propagator(|propagator| {
        propagator.inject_context(&context, &mut carrier);
    });
    carrier
}

/// Extracts a parent context from carrier pairs.
#[must_use]
pub fn extract_context(carrier: &HeaderCarrier) -> Context {
    opentelemetry::global::get_text_map_propagator(|propagator| propagator.extract(carrier))
}

/// Trace id of `context` as 32 lowercase hex chars, when it carries a valid
/// span.
#[must_use]
pub fn trace_id_hex(context: &Context) -> Option<String> {
    let span = context.span();
    let span_context = span.span_context();
    span_context.is_valid().then(|| span_context.trace_id().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opentelemetry_sdk::propagation::TraceContextPropagator;

    fn install_propagator() {
        opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());
    }

    #[test]
    fn test_extract_reads_w3c_traceparent() {
        install_propagator();
        let carrier = HeaderCarrier::from_pairs([(
            "traceparent".to_owned(),
            "00-0af7651916cd43dd8448eb211c80319c-b7ad6b7169203331-01".to_owned(),
        )]);

        let context = extract_context(&carrier);

        assert_eq!(
            trace_id_hex(&context).as_deref(),
            Some("0af7651916cd43dd8448eb211c80319c")
        );
    }

    #[test]
    fn test_extract_of_empty_carrier_has_no_trace_id() {
        install_propagator();
        let context = extract_context(&HeaderCarrier::new());
        assert_eq!(trace_id_hex(&context), None);
    }

    #[test]
    fn test_inject_then_extract_round_trips_remote_context() {
        install_propagator();
        let incoming = HeaderCarrier::from_pairs([(
            "traceparent".to_owned(),
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01".to_owned(),
        )]);
        let context = extract_context(&incoming);

        let mut outgoing = HeaderCarrier::new();
        opentelemetry::global::get_text_map_propagator(|propagator| {
            propagator.inject_context(&context, &mut outgoing);
        });

        let reread = extract_context(&outgoing);
        assert_eq!(
            trace_id_hex(&reread).as_deref(),
            Some("4bf92f3577b34da6a3ce929d0e0e4736")
        );
    }
}
