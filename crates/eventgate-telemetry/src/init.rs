//! Tracing and metrics bootstrap.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_otlp::WithExportConfig;
use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Errors raised while bootstrapping telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The OTLP trace exporter could not be installed.
    #[error("failed to install OTLP trace exporter: {0}")]
    Trace(String),

    /// The Prometheus recorder could not be installed.
    #[error("failed to install Prometheus recorder: {0}")]
    Metrics(String),
}

/// Initializes the global W3C propagator and the tracing subscriber: JSON
/// log output filtered by `RUST_LOG`, plus span export when an OTLP
/// collector endpoint is configured. Propagation works either way.
///
/// # Errors
///
/// Returns `TelemetryError::Trace` if the OTLP pipeline cannot be built.
pub fn init_tracing(service_name: &str, otlp_endpoint: Option<&str>) -> Result<(), TelemetryError> {
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    let otel_layer = match otlp_endpoint {
        Some(endpoint) => {
            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(
                    opentelemetry_otlp::new_exporter()
                        .tonic()
                        .with_endpoint(endpoint.to_owned()),
                )
                .with_trace_config(opentelemetry_sdk::trace::config().with_resource(
                    Resource::new(vec![KeyValue::new("service.name", service_name.to_owned())]),
                ))
                .install_batch(opentelemetry_sdk::runtime::Tokio)
                .map_err(|e| TelemetryError::Trace(e.to_string()))?;
            Some(tracing_opentelemetry::layer().with_tracer(tracer))
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().json())
        .with(otel_layer)
        .init();

    Ok(())
}

/// Installs the process-wide Prometheus recorder and returns the handle the
/// metrics route renders from.
///
/// # Errors
///
/// Returns `TelemetryError::Metrics` if a recorder is already installed.
pub fn install_metrics_recorder() -> Result<PrometheusHandle, TelemetryError> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| TelemetryError::Metrics(e.to_string()))
}
