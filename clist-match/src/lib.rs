//! clist-match library - vendor matching service
//!
//! Resolves free-text vendor mentions from surveys to canonical vendor records,
//! one admin-driven match session at a time.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use clist_common::events::EventBus;
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;

use crate::services::{MatchSettings, VendorMatcher};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    pub matcher: VendorMatcher,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, event_bus: EventBus, settings: MatchSettings) -> Self {
        let matcher = VendorMatcher::new(db.clone(), event_bus.clone(), settings);
        Self::with_matcher(db, event_bus, matcher)
    }

    /// State around a preconfigured matcher (completion hook, custom settings)
    pub fn with_matcher(db: SqlitePool, event_bus: EventBus, matcher: VendorMatcher) -> Self {
        Self {
            db,
            event_bus,
            matcher,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::match_routes())
        .route("/match/events", get(api::match_event_stream))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
