use axum::{
    extract::State,
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use shareit_core::booking::{BookingDetails, BookingRole, BookingState, CreateBooking};

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
pub struct RespondQuery {
    pub approved: bool,
}

#[derive(Debug, Deserialize)]
pub struct StateQuery {
    pub state: Option<String>,
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/bookings", post(create_booking).get(list_booker_bookings))
        .route("/bookings/owner", get(list_owner_bookings))
        .route("/bookings/{id}", patch(respond).get(get_booking))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /bookings
async fn create_booking(
    State(state): State<AppState>,
    SharerUserId(booker_id): SharerUserId,
    AppJson(body): AppJson<CreateBooking>,
) -> Result<Json<BookingDetails>, AppError> {
    Ok(Json(state.bookings.create_booking(booker_id, body).await?))
}

/// PATCH /bookings/{id}?approved=
async fn respond(
    State(state): State<AppState>,
    SharerUserId(owner_id): SharerUserId,
    AppPath(booking_id): AppPath<i64>,
    AppQuery(query): AppQuery<RespondQuery>,
) -> Result<Json<BookingDetails>, AppError> {
    Ok(Json(state.bookings.respond(booking_id, query.approved, owner_id).await?))
}

/// GET /bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    AppPath(booking_id): AppPath<i64>,
) -> Result<Json<BookingDetails>, AppError> {
    Ok(Json(state.bookings.get_booking(booking_id, user_id).await?))
}

/// GET /bookings?state=
async fn list_booker_bookings(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    AppQuery(query): AppQuery<StateQuery>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    let filter = BookingState::parse_lenient(query.state.as_deref());
    Ok(Json(state.bookings.list_bookings(user_id, BookingRole::Booker, filter).await?))
}

/// GET /bookings/owner?state=
async fn list_owner_bookings(
    State(state): State<AppState>,
    SharerUserId(user_id): SharerUserId,
    AppQuery(query): AppQuery<StateQuery>,
) -> Result<Json<Vec<BookingDetails>>, AppError> {
    let filter = BookingState::parse_lenient(query.state.as_deref());
    Ok(Json(state.bookings.list_bookings(user_id, BookingRole::Owner, filter).await?))
}
