//! Environment-driven configuration for the ingress endpoint.

use std::env;

use thiserror::Error;

/// Default log topic for raw events.
pub const DEFAULT_TOPIC: &str = "events.raw.v1";

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

/// Runtime configuration for the ingress endpoint.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Comma-separated log bootstrap endpoints.
    pub kafka_bootstrap_servers: String,
    /// Topic accepted envelopes are published to.
    pub kafka_topic: String,
    /// PostgreSQL connection string.
    pub database_url: String,
    /// OTLP collector endpoint; span export is disabled when unset.
    pub otlp_endpoint: Option<String>,
}

impl ApiConfig {
    /// Reads configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when a required variable is missing or a value
    /// does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_owned()),
            port: parse_port("PORT", 8080)?,
            kafka_bootstrap_servers: require("KAFKA_BOOTSTRAP_SERVERS")?,
            kafka_topic: env::var("KAFKA_TOPIC").unwrap_or_else(|_| DEFAULT_TOPIC.to_owned()),
            database_url: require("DATABASE_URL")?,
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
