use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shareit_core::booking::{Booking, BookingDetails, BookingStatus, NewBooking};
use shareit_core::item::Item;
use shareit_core::repository::{BookingRepository, RepoResult};
use shareit_core::user::User;
use sqlx::PgPool;

pub struct StoreBookingRepository {
    pool: PgPool,
}

impl StoreBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: i64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    item_id: i64,
    booker_id: i64,
    status: String,
}

impl BookingRow {
    fn into_booking(self) -> RepoResult<Booking> {
        Ok(Booking {
            id: self.id,
            start: self.start_date,
            end: self.end_date,
            item_id: self.item_id,
            booker_id: self.booker_id,
            status: self.status.parse::<BookingStatus>()?,
        })
    }
}

// Booking joined with its item and booker
#[derive(sqlx::FromRow)]
struct BookingDetailsRow {
    id: i64,
    start_date: DateTime<Utc>,
    end_date: DateTime<Utc>,
    status: String,
    item_id: i64,
    item_name: String,
    item_description: String,
    item_available: bool,
    item_owner_id: i64,
    item_request_id: Option<i64>,
    booker_id: i64,
    booker_name: String,
    booker_email: String,
}

impl BookingDetailsRow {
    fn into_details(self) -> RepoResult<BookingDetails> {
        Ok(BookingDetails {
            id: self.id,
            start: self.start_date,
            end: self.end_date,
            status: self.status.parse::<BookingStatus>()?,
            item: Item {
                id: self.item_id,
                name: self.item_name,
                description: self.item_description,
                available: self.item_available,
                owner_id: self.item_owner_id,
                request_id: self.item_request_id,
            },
            booker: User { id: self.booker_id, name: self.booker_name, email: self.booker_email },
        })
    }
}

const BOOKING_COLUMNS: &str = "id, start_date, end_date, item_id, booker_id, status";

const DETAILS_SELECT: &str = r#"
    SELECT b.id, b.start_date, b.end_date, b.status,
           i.id AS item_id, i.name AS item_name, i.description AS item_description,
           i.available AS item_available, i.owner_id AS item_owner_id, i.request_id AS item_request_id,
           u.id AS booker_id, u.name AS booker_name, u.email AS booker_email
    FROM bookings b
    JOIN items i ON i.id = b.item_id
    JOIN users u ON u.id = b.booker_id
"#;

fn into_details(rows: Vec<BookingDetailsRow>) -> RepoResult<Vec<BookingDetails>> {
    rows.into_iter().map(BookingDetailsRow::into_details).collect()
}

#[async_trait]
impl BookingRepository for StoreBookingRepository {
    async fn create_booking(&self, booking: &NewBooking) -> RepoResult<Booking> {
        let sql = format!(
            "INSERT INTO bookings (start_date, end_date, item_id, booker_id, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            BOOKING_COLUMNS
        );
        let row = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(booking.start)
            .bind(booking.end)
            .bind(booking.item_id)
            .bind(booking.booker_id)
            .bind(booking.status.as_str())
            .fetch_one(&self.pool)
            .await?;

        row.into_booking()
    }

    async fn get_booking(&self, id: i64) -> RepoResult<Option<BookingDetails>> {
        let sql = format!("{} WHERE b.id = $1", DETAILS_SELECT);
        let row = sqlx::query_as::<_, BookingDetailsRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(BookingDetailsRow::into_details).transpose()
    }

    async fn update_status(&self, id: i64, status: BookingStatus) -> RepoResult<()> {
        sqlx::query("UPDATE bookings SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_booker(&self, booker_id: i64) -> RepoResult<Vec<BookingDetails>> {
        let sql = format!("{} WHERE b.booker_id = $1 ORDER BY b.start_date DESC", DETAILS_SELECT);
        let rows = sqlx::query_as::<_, BookingDetailsRow>(&sql)
            .bind(booker_id)
            .fetch_all(&self.pool)
            .await?;

        into_details(rows)
    }

    async fn list_by_owner(&self, owner_id: i64) -> RepoResult<Vec<BookingDetails>> {
        let sql = format!("{} WHERE i.owner_id = $1 ORDER BY b.start_date DESC", DETAILS_SELECT);
        let rows = sqlx::query_as::<_, BookingDetailsRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        into_details(rows)
    }

    async fn list_approved_for_items(&self, item_ids: &[i64]) -> RepoResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {} FROM bookings WHERE item_id = ANY($1) AND status = $2 ORDER BY start_date DESC",
            BOOKING_COLUMNS
        );
        let rows = sqlx::query_as::<_, BookingRow>(&sql)
            .bind(item_ids)
            .bind(BookingStatus::Approved.as_str())
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(BookingRow::into_booking).collect()
    }

    async fn has_completed_rental(
        &self,
        booker_id: i64,
        item_id: i64,
        now: DateTime<Utc>,
    ) -> RepoResult<bool> {
        let completed: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM bookings \
             WHERE booker_id = $1 AND item_id = $2 AND status = $3 AND end_date < $4)",
        )
        .bind(booker_id)
        .bind(item_id)
        .bind(BookingStatus::Approved.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        Ok(completed)
    }
}
