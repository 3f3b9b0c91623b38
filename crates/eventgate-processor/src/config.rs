//! Environment-driven configuration for the processor.

use std::env;

use thiserror::Error;

/// Default log topic for raw events.
pub const DEFAULT_TOPIC: &str = "events.raw.v1";

/// Default consumer group id; stable so offsets survive restarts.
pub const DEFAULT_CONSUMER_GROUP: &str = "eventgate-processor";

/// Errors raised while reading configuration from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing or empty.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// A variable could not be parsed.
    #[error("invalid value for {name}: {message}")]
    Invalid {
        /// The offending variable.
        name: &'static str,
        /// Why parsing failed.
        message: String,
    },
}

/// Runtime configuration for the processor.
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Interface the observability endpoints bind.
    pub host: String,
    /// Port the observability endpoints bind.
    pub port: u16,
    /// Comma-separated log bootstrap endpoints.
    pub kafka_bootstrap_servers: String,
    /// Topic to consume raw events from.
    pub kafka_topic: String,
    /// Consumer group id.
    pub kafka_consumer_group: String,
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Base URL of the live-broadcast hub; fan-out is disabled when unset.
    pub broadcast_sink_url: Option<String>,
    /// OTLP collector endpoint; span export is disabled when unset.
    pub otlp_endpoint: Option<String>,
}

impl ProcessorConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_owned()),
            port: parse_port("PORT", 8081)?,
            kafka_bootstrap_servers: require("KAFKA_BOOTSTRAP_SERVERS")?,
            kafka_topic: env::var("KAFKA_TOPIC").unwrap_or_else(|_| DEFAULT_TOPIC.to_owned()),
            kafka_consumer_group: env::var("KAFKA_CONSUMER_GROUP")
                .unwrap_or_else(|_| DEFAULT_CONSUMER_GROUP.to_owned()),
            database_url: require("DATABASE_URL")?,
            broadcast_sink_url: env::var("BROADCAST_SINK_URL")
                .ok()
                .filter(|v| !v.trim().is_empty()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.trim().is_empty()),
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse_port(name: &'static str, default: u16) -> Result<u16, ConfigError> {
    match env::var(name) {
        Ok(value) => value.parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
            name,
            message: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
