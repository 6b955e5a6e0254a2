//! Liveness and status endpoints

use axum::{Json, extract::State as AxumState, response::IntoResponse};
use serde_json::json;

use crate::SharedState;

pub async fn root() -> &'static str {
    "push_hook_runner is running"
}

/// GET /status - Server info and the active configuration snapshot
pub async fn status(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    let snapshot = state.store.current();

    Json(json!({
        "server": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": state.started_at,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
            "deliveries_in_flight": state.deliveries_in_flight(),
        },
        "config": {
            "path": state.store.path().to_string_lossy(),
            "generation": snapshot.generation,
            "loaded_at": snapshot.loaded_at,
            "total_repositories": snapshot.config.repositories.len(),
            "repositories": snapshot.config.repository_names(),
            "command_timeout_seconds": snapshot.config.command_timeout_secs,
        }
    }))
}
