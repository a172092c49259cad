use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::booking::{Booking, BookingDetails, BookingStatus, NewBooking};
use crate::item::{Comment, Item, NewComment, NewItem};
use crate::request::ItemRequest;
use crate::user::{NewUser, User};
use crate::{CoreError, CoreResult};

pub type RepoError = Box<dyn std::error::Error + Send + Sync>;
pub type RepoResult<T> = Result<T, RepoError>;

/// Repository trait for user accounts
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> RepoResult<User>;

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    async fn update_user(&self, user: &User) -> RepoResult<User>;

    async fn delete_user(&self, id: i64) -> RepoResult<()>;
}

/// Repository trait for listed items
#[async_trait]
pub trait ItemRepository: Send + Sync {
    async fn create_item(&self, owner_id: i64, item: &NewItem) -> RepoResult<Item>;

    async fn get_item(&self, id: i64) -> RepoResult<Option<Item>>;

    async fn update_item(&self, item: &Item) -> RepoResult<Item>;

    /// Ordered by id.
    async fn list_by_owner(&self, owner_id: i64) -> RepoResult<Vec<Item>>;

    /// Case-insensitive substring match on name or description, available items only.
    async fn search_available(&self, text: &str) -> RepoResult<Vec<Item>>;

    /// Items answering any of the given requests.
    async fn list_by_requests(&self, request_ids: &[i64]) -> RepoResult<Vec<Item>>;
}

/// Repository trait for bookings
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create_booking(&self, booking: &NewBooking) -> RepoResult<Booking>;

    async fn get_booking(&self, id: i64) -> RepoResult<Option<BookingDetails>>;

    async fn update_status(&self, id: i64, status: BookingStatus) -> RepoResult<()>;

    /// Ordered by start, newest first.
    async fn list_by_booker(&self, booker_id: i64) -> RepoResult<Vec<BookingDetails>>;

    /// Bookings on items owned by `owner_id`, ordered by start, newest first.
    async fn list_by_owner(&self, owner_id: i64) -> RepoResult<Vec<BookingDetails>>;

    /// APPROVED bookings for all given items in one lookup.
    async fn list_approved_for_items(&self, item_ids: &[i64]) -> RepoResult<Vec<Booking>>;

    /// Whether `booker_id` has an APPROVED booking on `item_id` that ended before `now`.
    async fn has_completed_rental(
        &self,
        booker_id: i64,
        item_id: i64,
        now: DateTime<Utc>,
    ) -> RepoResult<bool>;
}

/// Repository trait for item comments
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn create_comment(&self, comment: &NewComment) -> RepoResult<Comment>;

    /// Comments on all given items in one lookup, newest first.
    async fn list_for_items(&self, item_ids: &[i64]) -> RepoResult<Vec<Comment>>;
}

/// Repository trait for item requests
#[async_trait]
pub trait RequestRepository: Send + Sync {
    async fn create_request(
        &self,
        requester_id: i64,
        description: &str,
        created: DateTime<Utc>,
    ) -> RepoResult<ItemRequest>;

    async fn get_request(&self, id: i64) -> RepoResult<Option<ItemRequest>>;

    /// Newest first.
    async fn list_by_requester(&self, requester_id: i64) -> RepoResult<Vec<ItemRequest>>;

    /// Everyone else's requests, newest first.
    async fn list_excluding_requester(&self, requester_id: i64) -> RepoResult<Vec<ItemRequest>>;
}

/// The full set of storage handles the services work against.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub items: Arc<dyn ItemRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub comments: Arc<dyn CommentRepository>,
    pub requests: Arc<dyn RequestRepository>,
}

impl Repositories {
    pub(crate) async fn user_or_not_found(&self, id: i64) -> CoreResult<User> {
        self.users
            .get_user(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("User with id={} not found", id)))
    }

    pub(crate) async fn item_or_not_found(&self, id: i64) -> CoreResult<Item> {
        self.items
            .get_item(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Item with id={} not found", id)))
    }

    pub(crate) async fn booking_or_not_found(&self, id: i64) -> CoreResult<BookingDetails> {
        self.bookings
            .get_booking(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Booking with id={} not found", id)))
    }

    pub(crate) async fn request_or_not_found(&self, id: i64) -> CoreResult<ItemRequest> {
        self.requests
            .get_request(id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Request with id={} not found", id)))
    }
}
