use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use shareit_core::user::{NewUser, User, UserPatch};

use crate::{error::AppError, extract::{AppJson, AppPath}, state::AppState};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user).patch(update_user).delete(delete_user))
}

/// POST /users
async fn create_user(
    State(state): State<AppState>,
    AppJson(body): AppJson<NewUser>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.create_user(body).await?))
}

/// GET /users/{id}
async fn get_user(State(state): State<AppState>, AppPath(id): AppPath<i64>) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.get_user(id).await?))
}

/// PATCH /users/{id}
async fn update_user(
    State(state): State<AppState>,
    AppPath(id): AppPath<i64>,
    AppJson(patch): AppJson<UserPatch>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.update_user(id, patch).await?))
}

/// DELETE /users/{id}
async fn delete_user(State(state): State<AppState>, AppPath(id): AppPath<i64>) -> Result<Json<User>, AppError> {
    Ok(Json(state.users.delete_user(id).await?))
}
