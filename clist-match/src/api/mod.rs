//! HTTP API handlers for clist-match
//!
//! REST endpoints drive match sessions; `/match/events` streams match events over SSE.

pub mod health;
pub mod match_sessions;
pub mod sse;

pub use health::health_routes;
pub use match_sessions::match_routes;
pub use sse::match_event_stream;
