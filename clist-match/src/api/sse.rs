//! Server-Sent Events for match progress
//!
//! Streams every `MatchEvent`: session opened, mention matched or skipped,
//! action failed, session completed or closed.

use axum::{
    extract::State,
    response::sse::{Event, Sse},
};
use futures::stream::Stream;
use std::convert::Infallible;

use crate::AppState;

/// GET /match/events
pub async fn match_event_stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    clist_common::sse::create_event_sse_stream("clist-match", &state.event_bus)
}
