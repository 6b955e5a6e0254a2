//! Webhook handler for push events

use axum::{
    body::Bytes, extract::State as AxumState, extract::rejection::BytesRejection,
    http::HeaderMap, http::StatusCode,
};
use std::sync::Arc;
use tracing::{Instrument, debug, error, info, info_span};
use uuid::Uuid;

use crate::SharedState;
use crate::ingest::{decode_delivery, process_event};

/// Handles the webhook POST request.
///
/// The body is decoded before responding so a malformed delivery gets a 400.
/// Commands run in a tracked background task; the sender gets 202 right away
/// and never sees command outcomes, which are only logged.
pub async fn handle_webhook(
    AxumState(state): AxumState<SharedState>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> StatusCode {
    let delivery_id = Uuid::now_v7();
    let event_kind = headers.get("X-Gitlab-Event").and_then(|v| v.to_str().ok());

    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            error!(%delivery_id, ?event_kind, "Rejected webhook body: {}", rejection.body_text());
            return rejection.status();
        }
    };
    debug!(%delivery_id, ?event_kind, bytes = body.len(), "Received webhook");

    let span = info_span!(
        "delivery",
        %delivery_id,
        repository = tracing::field::Empty
    );
    let Ok(event) = span.in_scope(|| decode_delivery(&body)) else {
        return StatusCode::BAD_REQUEST;
    };
    span.record("repository", event.repository.name.as_str());

    info!(%delivery_id, "Accepted push for '{}'", event.repository.name);

    let shared_state = Arc::clone(&state);
    state.spawn_delivery(
        async move {
            process_event(&shared_state, &event).await;
        }
        .instrument(span),
    );

    StatusCode::ACCEPTED
}
