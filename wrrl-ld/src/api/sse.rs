//! Server-Sent Events (SSE) feed of ledger events
//!
//! Streams every applied command's `LedgerEvent` to subscribers, with a
//! keep-alive heartbeat. Rejected commands never reach this feed; the
//! journal browse API is the place to audit those.

use crate::AppState;
use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

/// GET /api/events - SSE stream of applied ledger events
///
/// Emits an initial ConnectionStatus event, then one named event per
/// applied command (PaymentCreated, DistributionPaid, ...).
pub async fn event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    wrrl_common::sse::create_event_sse_stream(state.subscribe_events(), "wrrl-ld")
}
