//! Match session API handlers
//!
//! POST /match/sessions, GET|DELETE /match/sessions/:id and one POST per admin
//! action. Every action responds with the updated session view.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::ApiResult,
    models::MatchSessionView,
    services::SearchHit,
    AppState,
};

/// POST /match/sessions request
#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    pub preview_session_id: Uuid,
    /// Explicit queue; defaults to every unmatched mention of the preview session
    #[serde(default)]
    pub mention_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// GET /match/sessions/:id/search response
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub session_id: Uuid,
    pub query: String,
    pub hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
pub struct SelectVendorRequest {
    pub vendor_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CreateVendorRequest {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// POST /match/sessions
///
/// Returns 201 with the new session. A queue with nothing to match comes back
/// already COMPLETE.
pub async fn open_session(
    State(state): State<AppState>,
    Json(request): Json<OpenSessionRequest>,
) -> ApiResult<(StatusCode, Json<MatchSessionView>)> {
    let view = state
        .matcher
        .open_session(request.preview_session_id, request.mention_ids)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /match/sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<MatchSessionView>> {
    Ok(Json(state.matcher.get_session(session_id).await?))
}

/// DELETE /match/sessions/:id
pub async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<MatchSessionView>> {
    Ok(Json(state.matcher.close_session(session_id).await?))
}

/// POST /match/sessions/:id/confirm
pub async fn confirm_exact(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<MatchSessionView>> {
    Ok(Json(state.matcher.confirm_exact(session_id).await?))
}

/// GET /match/sessions/:id/search?q=
pub async fn search(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<SearchResponse>> {
    let hits = state.matcher.search(session_id, &query.q).await?;
    Ok(Json(SearchResponse {
        session_id,
        query: query.q,
        hits,
    }))
}

/// POST /match/sessions/:id/select
pub async fn select_vendor(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SelectVendorRequest>,
) -> ApiResult<Json<MatchSessionView>> {
    Ok(Json(
        state
            .matcher
            .select_vendor(session_id, request.vendor_id)
            .await?,
    ))
}

/// POST /match/sessions/:id/create
pub async fn create_vendor(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<CreateVendorRequest>,
) -> ApiResult<Json<MatchSessionView>> {
    Ok(Json(
        state
            .matcher
            .create_vendor(session_id, &request.name, request.phone.as_deref())
            .await?,
    ))
}

/// POST /match/sessions/:id/skip
pub async fn skip(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<MatchSessionView>> {
    Ok(Json(state.matcher.skip(session_id).await?))
}

/// POST /match/sessions/:id/notice/dismiss
pub async fn dismiss_notice(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<MatchSessionView>> {
    Ok(Json(state.matcher.dismiss_notice(session_id).await?))
}

pub fn match_routes() -> Router<AppState> {
    Router::new()
        .route("/match/sessions", post(open_session))
        .route("/match/sessions/:id", get(get_session).delete(close_session))
        .route("/match/sessions/:id/confirm", post(confirm_exact))
        .route("/match/sessions/:id/search", get(search))
        .route("/match/sessions/:id/select", post(select_vendor))
        .route("/match/sessions/:id/create", post(create_vendor))
        .route("/match/sessions/:id/skip", post(skip))
        .route("/match/sessions/:id/notice/dismiss", post(dismiss_notice))
}
