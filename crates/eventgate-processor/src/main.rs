//! Eventgate processor entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;

use eventgate_core::broadcast::BroadcastSink;
use eventgate_core::clock::SystemClock;
use eventgate_processor::config::ProcessorConfig;
use eventgate_processor::fanout::HttpBroadcastSink;
use eventgate_processor::pipeline::Pipeline;
use eventgate_processor::{consumer, server};
use eventgate_store::pg_event_store::PgEventStore;
use eventgate_store::schema;

#[tokio::main]
async fn main() {
    let config = ProcessorConfig::from_env().expect("invalid configuration");

    eventgate_telemetry::init_tracing("eventgate-processor", config.otlp_endpoint.as_deref())
        .expect("failed to initialize tracing");
    let metrics =
        eventgate_telemetry::install_metrics_recorder().expect("failed to install metrics recorder");

    tracing::info!(
        bootstrap_servers = %config.kafka_bootstrap_servers,
        topic = %config.kafka_topic,
        group_id = %config.kafka_consumer_group,
        "starting eventgate processor"
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

    let store = Arc::new(PgEventStore::new(pool.clone()));
    let sink = config
        .broadcast_sink_url
        .as_deref()
        .map(|url| Arc::new(HttpBroadcastSink::new(url)) as Arc<dyn BroadcastSink>);
    if sink.is_none() {
        tracing::info!("no broadcast sink configured; fan-out disabled");
    }
    let pipeline = Pipeline::new(store, sink, Arc::new(SystemClock));

    let kafka_consumer =
        consumer::create_consumer(&config.kafka_bootstrap_servers, &config.kafka_consumer_group)
            .expect("failed to create Kafka consumer");

    let shutdown = CancellationToken::new();

    // Observability endpoints.
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("invalid HOST:PORT combination");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind observability endpoints");
    tracing::info!("observability endpoints on {}", addr);

    let server_shutdown = shutdown.clone();
    let server_task = tokio::spawn(async move {
        axum::serve(listener, server::router(metrics))
            .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
            .await
    });

    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("shutdown signal received");
        signal_shutdown.cancel();
    });

    if let Err(error) = consumer::run(kafka_consumer, pipeline, &config.kafka_topic, shutdown).await
    {
        tracing::error!(%error, "consumer loop failed");
    }

    match server_task.await {
        Ok(Ok(())) => {}
        Ok(Err(error)) => tracing::error!(%error, "observability server failed"),
        Err(error) => tracing::error!(%error, "observability server panicked"),
    }

    pool.close().await;
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
