use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use shareit_core::item::{Comment, Item, ItemPatch, ItemView, NewItem};

use crate::{
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    identity::SharerUserId,
    state::AppState,
};

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub text: String,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/items", post(create_item).get(list_owner_items))
        .route("/items/search", get(search_items))
        .route("/items/{id}", get(get_item).patch(update_item))
        .route("/items/{id}/comment", post(add_comment))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /items
async fn create_item(
    State(state): State<AppState>,
    SharerUserId(owner_id): SharerUserId,
    AppJson(body): AppJson<NewItem>,
) -> Result<Json<Item>, AppError> {
    Ok(Json(state.items.create_item(owner_id, body).await?))
}

/// PATCH /items/{id}
async fn update_item(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    AppPath(item_id): AppPath<i64>,
    AppJson(patch): AppJson<ItemPatch>,
) -> Result<Json<Item>, AppError> {
    Ok(Json(state.items.update_item(user_id, item_id, patch).await?))
}

/// GET /items/{id}
async fn get_item(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    AppPath(item_id): AppPath<i64>,
) -> Result<Json<ItemView>, AppError> {
    Ok(Json(state.items.get_item(item_id, user_id).await?))
}

/// GET /items
async fn list_owner_items(
    State(state): State<AppState>,
    SharerUserId(owner_id): SharerUserId,
) -> Result<Json<Vec<ItemView>>, AppError> {
    Ok(Json(state.items.list_owner_items(owner_id).await?))
}

/// GET /items/search?text=
async fn search_items(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<SearchQuery>,
) -> Result<Json<Vec<Item>>, AppError> {
    Ok(Json(state.items.search(&query.text).await?))
}

/// POST /items/{id}/comment
async fn add_comment(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    AppPath(item_id): AppPath<i64>,
    AppJson(body): AppJson<CommentRequest>,
) -> Result<Json<Comment>, AppError> {
    Ok(Json(state.items.add_comment(item_id, user_id, body.text).await?))
}
