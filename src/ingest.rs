//! Per-delivery processing boundary
//!
//! Everything that can go wrong while handling one delivery is turned into
//! log output here; nothing propagates to other deliveries or the server.

use tracing::{error, info, warn};

use crate::AppState;
use crate::dispatch::dispatch;
use crate::error::Result;
use crate::runner::CommandResult;
use crate::webhook::{WebhookEvent, decode_event};

/// Decode `body`, logging the reason when it is rejected.
pub fn decode_delivery(body: &[u8]) -> Result<WebhookEvent> {
    decode_event(body).inspect_err(|e| error!("{}", e))
}

/// Decode `body` and run the matching commands against the current snapshot.
///
/// A decode failure is logged and returned; no command runs in that case.
pub async fn handle_delivery(state: &AppState, body: &[u8]) -> Result<Vec<CommandResult>> {
    let event = decode_delivery(body)?;
    Ok(process_event(state, &event).await)
}

/// Run the commands for an already decoded event.
///
/// The snapshot is taken once, so a reload during the run does not change
/// which commands this delivery executes.
pub async fn process_event(state: &AppState, event: &WebhookEvent) -> Vec<CommandResult> {
    let snapshot = state.store.current();
    info!(
        generation = snapshot.generation,
        "Push event for {}",
        event.describe()
    );

    let results = dispatch(event, &snapshot.config, state.runner.as_ref()).await;

    if results.is_empty() {
        warn!(
            "No matching repository for '{}', skipping.",
            event.repository.name
        );
        return results;
    }

    let failed = results.iter().filter(|r| !r.succeeded).count();
    if failed == 0 {
        info!(
            "All {} commands for '{}' succeeded",
            results.len(),
            event.repository.name
        );
    } else {
        warn!(
            "{} of {} commands for '{}' failed",
            failed,
            results.len(),
            event.repository.name
        );
    }

    results
}
