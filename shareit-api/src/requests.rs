use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shareit_core::request::{RequestScope, RequestView};

use crate::{
    error::AppError,
    extract::{AppJson, AppPath},
    identity::SharerUserId,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct NewRequestBody {
    pub description: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/requests", post(create_request).get(list_own_requests))
        .route("/requests/all", get(list_other_requests))
        .route("/requests/{id}", get(get_request))
}

/// POST /requests
async fn create_request(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    AppJson(body): AppJson<NewRequestBody>,
) -> Result<Json<RequestView>, AppError> {
    Ok(Json(state.requests.create_request(user_id, body.description).await?))
}

/// GET /requests
async fn list_own_requests(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
) -> Result<Json<Vec<RequestView>>, AppError> {
    Ok(Json(state.requests.list_requests(user_id, RequestScope::Own).await?))
}

/// GET /requests/all
async fn list_other_requests(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
) -> Result<Json<Vec<RequestView>>, AppError> {
    Ok(Json(state.requests.list_requests(user_id, RequestScope::Others).await?))
}

/// GET /requests/{id}
async fn get_request(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    AppPath(request_id): AppPath<i64>,
) -> Result<Json<RequestView>, AppError> {
    Ok(Json(state.requests.get_request(user_id, request_id).await?))
}
