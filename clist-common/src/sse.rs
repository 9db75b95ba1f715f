//! Server-Sent Events (SSE) utilities

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::events::EventBus;

/// Stream every `MatchEvent` on `event_bus` to one SSE client
///
/// Sends a `ConnectionStatus` event first, then one SSE event per broadcast
/// event (named by `event_type()`, JSON payload). Axum's keep-alive sends a
/// heartbeat comment after 15 idle seconds. A lagging client skips the dropped
/// events and keeps going.
pub fn create_event_sse_stream(
    service_name: &'static str,
    event_bus: &EventBus,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("New SSE client connected to {} match events", service_name);

    let mut rx = event_bus.subscribe();

    let stream = async_stream::stream! {
        yield Ok(Event::default()
            .event("ConnectionStatus")
            .data("connected"));

        loop {
            match rx.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(event_json) => {
                        debug!("SSE: Broadcasting event: {}", event.event_type());
                        yield Ok(Event::default()
                            .event(event.event_type())
                            .data(event_json));
                    }
                    Err(e) => {
                        warn!("SSE: Failed to serialize event: {}", e);
                    }
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("SSE: Client lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => {
                    info!("SSE: Event bus closed, ending {} stream", service_name);
                    break;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
