pub mod app_config;
pub mod booking_repo;
pub mod comment_repo;
pub mod database;
pub mod item_repo;
pub mod request_repo;
pub mod user_repo;

use std::sync::Arc;

use shareit_core::Repositories;
use sqlx::PgPool;

pub use app_config::Config;
pub use booking_repo::StoreBookingRepository;
pub use comment_repo::StoreCommentRepository;
pub use database::{DbClient, MIGRATOR};
pub use item_repo::StoreItemRepository;
pub use request_repo::StoreRequestRepository;
pub use user_repo::StoreUserRepository;

/// PostgreSQL-backed repositories sharing one pool.
pub fn repositories(pool: PgPool) -> Repositories {
    Repositories {
        users: Arc::new(StoreUserRepository::new(pool.clone())),
        items: Arc::new(StoreItemRepository::new(pool.clone())),
        bookings: Arc::new(StoreBookingRepository::new(pool.clone())),
        comments: Arc::new(StoreCommentRepository::new(pool.clone())),
        requests: Arc::new(StoreRequestRepository::new(pool)),
    }
}
