use axum::{http::Method, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod bookings;
pub mod error;
pub mod extract;
pub mod identity;
pub mod items;
pub mod requests;
pub mod state;
pub mod users;

pub use error::AppError;
pub use identity::SharerUserId;
pub use state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::USER_AGENT,
            axum::http::HeaderName::from_static("x-sharer-user-id"),
        ]);

    Router::new()
        .merge(users::routes())
        .merge(items::routes())
        .merge(bookings::routes())
        .merge(requests::routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
