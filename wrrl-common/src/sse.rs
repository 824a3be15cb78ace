//! Server-Sent Events (SSE) utilities
//!
//! Shared SSE implementation for WRRL services: forwards a broadcast
//! receiver of ledger events to a connected client, with heartbeats to keep
//! idle connections alive.

use axum::response::sse::{Event, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::events::LedgerEvent;

/// Create an SSE stream over a ledger event subscription
///
/// Sends an initial `ConnectionStatus` event, then one SSE event per
/// broadcast ledger event (event name = the event's type tag, data = the
/// JSON body). Lagged subscribers skip missed events rather than
/// disconnecting.
///
/// # Example
/// ```rust,ignore
/// pub async fn event_stream(
///     State(state): State<AppState>,
/// ) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
///     wrrl_common::sse::create_event_sse_stream(state.subscribe_events(), "wrrl-ld")
/// }
/// ```
pub fn create_event_sse_stream(
    mut rx: broadcast::Receiver<LedgerEvent>,
    service_name: &'static str,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} event stream", service_name);

    let stream = async_stream::stream! {
        // Initial connected status
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => {
                        yield Ok(Event::default().event(event.event_type()).data(json));
                    }
                    Err(e) => warn!("Failed to serialize event: {}", e),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("SSE: {} client lagged, {} events skipped", service_name, skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("SSE: {} event stream closed", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        axum::response::sse::KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
