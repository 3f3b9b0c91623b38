//! Eventgate Telemetry — tracing, propagation, and metrics bootstrap shared
//! by the gateway and the processor.

pub mod health;
pub mod init;
pub mod names;
pub mod propagation;

pub use init::{TelemetryError, init_tracing, install_metrics_recorder};
