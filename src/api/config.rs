//! Config reload endpoint

use axum::{Json, extract::State as AxumState, http::StatusCode, response::IntoResponse};
use serde_json::json;
use tracing::{error, info};

use crate::SharedState;

/// POST /reload - Reload configuration from the startup path
///
/// Goes through the same store operation as the reload signal, so it never
/// overlaps with a signal-driven reload.
pub async fn reload_config_endpoint(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    match state.store.reload().await {
        Ok(snapshot) => {
            info!(
                generation = snapshot.generation,
                "Configuration reloaded successfully from {:?}",
                state.store.path()
            );
            Json(json!({
                "status": "success",
                "generation": snapshot.generation,
                "repositories": snapshot.config.repository_names(),
            }))
            .into_response()
        }
        Err(e) => {
            error!("Failed to reload config: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "status": "error",
                    "message": e.to_string(),
                    "generation": state.store.current().generation,
                })),
            )
                .into_response()
        }
    }
}
