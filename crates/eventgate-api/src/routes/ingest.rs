//! The event ingestion route.

use std::time::Instant;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use opentelemetry::Context;
use serde::Serialize;
use tracing::{Instrument, info};
use tracing_opentelemetry::OpenTelemetrySpanExt;
use uuid::Uuid;

use eventgate_core::envelope::{EventEnvelope, InflightEvent};
use eventgate_core::error::DomainError;
use eventgate_core::fingerprint;
use eventgate_core::registry::RegisterOutcome;
use eventgate_telemetry::names;
use eventgate_telemetry::propagation::{self, HeaderCarrier};

use crate::error::ApiError;
use crate::state::AppState;

/// Request body cap; larger bodies are rejected at the transport layer.
pub const MAX_BODY_BYTES: usize = 256 * 1024;

/// Response body returned for accepted ingestions.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedResponse {
    /// The envelope's event id, echoed back.
    pub event_id: String,
    /// When the gateway accepted this request.
    pub received_at_utc: DateTime<Utc>,
    /// Trace id for correlating the request downstream.
    pub trace_id: String,
    /// True when the idempotency key was already registered with this body.
    pub duplicate: bool,
}

/// POST /v1/events
async fn ingest_event(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let started = Instant::now();

    let parent = extract_parent_context(&headers);
    let span = tracing::info_span!("ingest_event");
    span.set_parent(parent.clone());

    let response = match handle_ingest(&state, &headers, &body, &parent)
        .instrument(span)
        .await
    {
        Ok(accepted) => (StatusCode::ACCEPTED, Json(accepted)).into_response(),
        Err(error) => error.into_response(),
    };

    let status = response.status().as_u16().to_string();
    metrics::counter!(names::GATEWAY_REQUESTS_TOTAL, "status" => status).increment(1);
    metrics::histogram!(names::GATEWAY_REQUEST_DURATION_MS)
        .record(started.elapsed().as_secs_f64() * 1000.0);

    response
}

async fn handle_ingest(
    state: &AppState,
    headers: &HeaderMap,
    body: &[u8],
    parent: &Context,
) -> Result<AcceptedResponse, ApiError> {
    let idempotency_key = idempotency_key(headers)?;

    let envelope: EventEnvelope = serde_json::from_slice(body)
        .map_err(|e| DomainError::Validation(format!("invalid event envelope: {e}")))?;
    envelope.validate()?;

    let payload_hash = fingerprint::payload_hash(&envelope)?;
    let trace_id = request_trace_id(parent);

    match state
        .registry
        .try_register(&envelope.tenant_id, &idempotency_key, &payload_hash)
        .await?
    {
        RegisterOutcome::Conflict => return Err(DomainError::IdempotencyConflict.into()),
        RegisterOutcome::Duplicate => {
            info!(
                tenant_id = %envelope.tenant_id,
                idempotency_key = %idempotency_key,
                "duplicate ingestion attempt"
            );
            return Ok(AcceptedResponse {
                event_id: envelope.event_id,
                received_at_utc: state.clock.now(),
                trace_id,
                duplicate: true,
            });
        }
        RegisterOutcome::Inserted => {}
    }

    let received_at_utc = state.clock.now();
    let record = InflightEvent {
        envelope,
        idempotency_key: idempotency_key.clone(),
        payload_hash,
        received_at_utc: Some(received_at_utc),
        trace_id: trace_id.clone(),
    };

    if let Err(error) = state.publisher.publish(&record).await {
        if let Err(cleanup) = state
            .registry
            .unregister(&record.envelope.tenant_id, &idempotency_key)
            .await
        {
            tracing::warn!(%cleanup, "failed to unregister idempotency key after publish failure");
        }
        return Err(error.into());
    }

    info!(
        event_id = %record.envelope.event_id,
        tenant_id = %record.envelope.tenant_id,
        stream_key = %record.envelope.stream_key,
        "event accepted"
    );

    Ok(AcceptedResponse {
        event_id: record.envelope.event_id,
        received_at_utc,
        trace_id,
        duplicate: false,
    })
}

fn idempotency_key(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("idempotency-key")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| DomainError::Validation("Idempotency-Key header is required".to_owned()).into())
}

fn extract_parent_context(headers: &HeaderMap) -> Context {
    let carrier = HeaderCarrier::from_pairs(headers.iter().filter_map(|(name, value)| {
        let value = value.to_str().ok()?;
        Some((name.as_str().to_owned(), value.to_owned()))
    }));
    propagation::extract_context(&carrier)
}

/// Trace id for the response body and the inflight record: the active span
/// when it carries one, then the propagated parent, then a fresh
/// correlation id.
fn request_trace_id(parent: &Context) -> String {
    let span_context = tracing::Span::current().context();
    propagation::trace_id_hex(&span_context)
        .or_else(|| propagation::trace_id_hex(parent))
        .unwrap_or_else(|| Uuid::new_v4().simple().to_string())
}

/// Returns the router for the ingestion endpoint.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/events", post(ingest_event))
}
