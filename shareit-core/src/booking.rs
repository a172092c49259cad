use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shareit_shared::time::lenient_utc;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::item::Item;
use crate::repository::Repositories;
use crate::user::User;
use crate::{CoreError, CoreResult};

/// Booking lifecycle: WAITING, then exactly one owner decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Waiting,
    Approved,
    Rejected,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Waiting => "WAITING",
            BookingStatus::Approved => "APPROVED",
            BookingStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WAITING" => Ok(BookingStatus::Waiting),
            "APPROVED" => Ok(BookingStatus::Approved),
            "REJECTED" => Ok(BookingStatus::Rejected),
            other => Err(CoreError::InternalError(format!("Unknown booking status: {}", other))),
        }
    }
}

/// A booking row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Booking {
    pub id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub item_id: i64,
    pub booker_id: i64,
    pub status: BookingStatus,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub item_id: i64,
    pub booker_id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
}

/// Booking together with its item and booker, as returned to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetails {
    pub id: i64,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub status: BookingStatus,
    pub item: Item,
    pub booker: User,
}

impl BookingDetails {
    pub fn is_in(&self, state: BookingState, now: DateTime<Utc>) -> bool {
        state.matches(self.start, self.end, self.status, now)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    pub item_id: i64,
    #[serde(deserialize_with = "lenient_utc")]
    pub start: DateTime<Utc>,
    #[serde(deserialize_with = "lenient_utc")]
    pub end: DateTime<Utc>,
}

/// Which side of a booking a listing is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingRole {
    Booker,
    Owner,
}

/// Listing filter, evaluated against a single "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BookingState {
    #[default]
    All,
    Current,
    Past,
    Future,
    Waiting,
    Rejected,
}

impl BookingState {
    /// Case-insensitive. Absent or unrecognized values mean `All`.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim().to_ascii_uppercase()).as_deref() {
            Some("CURRENT") => BookingState::Current,
            Some("PAST") => BookingState::Past,
            Some("FUTURE") => BookingState::Future,
            Some("WAITING") => BookingState::Waiting,
            Some("REJECTED") => BookingState::Rejected,
            _ => BookingState::All,
        }
    }

    pub fn matches(
        self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        status: BookingStatus,
        now: DateTime<Utc>,
    ) -> bool {
        match self {
            BookingState::All => true,
            BookingState::Current => start <= now && end >= now,
            BookingState::Past => end < now,
            BookingState::Future => start > now,
            BookingState::Waiting => status == BookingStatus::Waiting,
            BookingState::Rejected => status == BookingStatus::Rejected,
        }
    }
}

/// Among APPROVED bookings: the latest one started at or before `now`, and
/// the earliest one starting after it.
pub fn last_and_next(bookings: &[Booking], now: DateTime<Utc>) -> (Option<&Booking>, Option<&Booking>) {
    let last = bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Approved && b.start <= now)
        .max_by_key(|b| b.start);
    let next = bookings
        .iter()
        .filter(|b| b.status == BookingStatus::Approved && b.start > now)
        .min_by_key(|b| b.start);
    (last, next)
}

/// Creates bookings, applies owner decisions and answers listings.
pub struct BookingService {
    repos: Repositories,
    clock: Arc<dyn Clock>,
}

impl BookingService {
    pub fn new(repos: Repositories, clock: Arc<dyn Clock>) -> Self {
        Self { repos, clock }
    }

    /// New bookings start in WAITING. The item must be available.
    pub async fn create_booking(&self, booker_id: i64, req: CreateBooking) -> CoreResult<BookingDetails> {
        let booker = self.repos.user_or_not_found(booker_id).await?;
        let item = self.repos.item_or_not_found(req.item_id).await?;

        if !item.available {
            warn!(item_id = item.id, booker_id, "Booking attempt on unavailable item");
            return Err(CoreError::NotAvailable(format!("Item with id={} is not available", item.id)));
        }
        if req.start >= req.end {
            return Err(CoreError::Forbidden("Booking end must be after its start".to_string()));
        }

        let booking = self
            .repos
            .bookings
            .create_booking(&NewBooking {
                item_id: item.id,
                booker_id: booker.id,
                start: req.start,
                end: req.end,
                status: BookingStatus::Waiting,
            })
            .await?;

        info!(booking_id = booking.id, item_id = item.id, booker_id, "Booking created");
        Ok(BookingDetails {
            id: booking.id,
            start: booking.start,
            end: booking.end,
            status: booking.status,
            item,
            booker,
        })
    }

    /// Owner decision on a WAITING booking. A decided booking stays decided.
    pub async fn respond(&self, booking_id: i64, approve: bool, owner_id: i64) -> CoreResult<BookingDetails> {
        let mut booking = self.repos.booking_or_not_found(booking_id).await?;

        if booking.item.owner_id != owner_id {
            warn!(booking_id, owner_id, "Booking decision by non-owner");
            return Err(CoreError::Forbidden("Only the item owner may respond to this booking".to_string()));
        }
        if booking.status != BookingStatus::Waiting {
            warn!(booking_id, status = %booking.status, "Booking already decided");
            return Err(CoreError::Forbidden(format!("Booking is already {}", booking.status)));
        }

        let status = if approve { BookingStatus::Approved } else { BookingStatus::Rejected };
        self.repos.bookings.update_status(booking_id, status).await?;
        booking.status = status;

        info!(booking_id, %status, "Booking decided");
        Ok(booking)
    }

    /// Visible to the booker and the item owner only.
    pub async fn get_booking(&self, booking_id: i64, requester_id: i64) -> CoreResult<BookingDetails> {
        self.repos.user_or_not_found(requester_id).await?;
        let booking = self.repos.booking_or_not_found(booking_id).await?;

        if booking.booker.id != requester_id && booking.item.owner_id != requester_id {
            warn!(booking_id, requester_id, "Booking read by unrelated user");
            return Err(CoreError::Forbidden("Booking belongs to another user".to_string()));
        }

        debug!(booking_id, requester_id, "Booking fetched");
        Ok(booking)
    }

    /// Bookings made by (`Booker`) or received on items of (`Owner`) the user,
    /// filtered by `state`, newest start first.
    pub async fn list_bookings(
        &self,
        user_id: i64,
        role: BookingRole,
        state: BookingState,
    ) -> CoreResult<Vec<BookingDetails>> {
        self.repos.user_or_not_found(user_id).await?;
        let now = self.clock.now();

        let all = match role {
            BookingRole::Booker => self.repos.bookings.list_by_booker(user_id).await?,
            BookingRole::Owner => self.repos.bookings.list_by_owner(user_id).await?,
        };

        let mut bookings: Vec<BookingDetails> = all.into_iter().filter(|b| b.is_in(state, now)).collect();
        bookings.sort_by(|a, b| b.start.cmp(&a.start));

        debug!(user_id, ?role, ?state, count = bookings.len(), "Bookings listed");
        Ok(bookings)
    }
}
