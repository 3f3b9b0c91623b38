//! Eventgate API server entry point.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use sqlx::postgres::PgPoolOptions;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use eventgate_api::config::ApiConfig;
use eventgate_api::producer::KafkaEventPublisher;
use eventgate_api::routes;
use eventgate_api::state::AppState;
use eventgate_core::clock::SystemClock;
use eventgate_store::pg_idempotency_registry::PgIdempotencyRegistry;
use eventgate_store::schema;

#[tokio::main]
async fn main() {
    let config = ApiConfig::from_env().expect("invalid configuration");

    eventgate_telemetry::init_tracing("eventgate-api", config.otlp_endpoint.as_deref())
        .expect("failed to initialize tracing");
    let metrics =
        eventgate_telemetry::install_metrics_recorder().expect("failed to install metrics recorder");

    tracing::info!(
        bootstrap_servers = %config.kafka_bootstrap_servers,
        topic = %config.kafka_topic,
        "starting eventgate API server"
    );

    // Create database connection pool and make sure the schema exists.
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to PostgreSQL");
    schema::ensure_schema(&pool)
        .await
        .expect("failed to create hot store schema");

    let publisher = Arc::new(
        KafkaEventPublisher::new(&config.kafka_bootstrap_servers, &config.kafka_topic)
            .expect("failed to create Kafka producer"),
    );
    let registry = Arc::new(PgIdempotencyRegistry::new(pool));
    let app_state = AppState::new(
        Arc::new(SystemClock),
        registry,
        publisher.clone(),
        metrics,
    );

    // Build router.
    let app = Router::new()
        .merge(routes::health::router())
        .merge(routes::metrics::router())
        .merge(routes::ingest::router())
        .layer(DefaultBodyLimit::max(routes::ingest::MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid HOST:PORT combination");
    tracing::info!("listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // In-flight requests are drained; release queued records before exit.
    publisher.flush(Duration::from_secs(5));
    tracing::info!("shutdown complete");
}

/// Resolves on ctrl-c or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}
