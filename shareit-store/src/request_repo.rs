use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shareit_core::repository::{RepoResult, RequestRepository};
use shareit_core::request::ItemRequest;
use sqlx::PgPool;

pub struct StoreRequestRepository {
    pool: PgPool,
}

impl StoreRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct RequestRow {
    id: i64,
    description: String,
    requester_id: i64,
    created_at: DateTime<Utc>,
}

impl From<RequestRow> for ItemRequest {
    fn from(row: RequestRow) -> Self {
        ItemRequest {
            id: row.id,
            description: row.description,
            requester_id: row.requester_id,
            created: row.created_at,
        }
    }
}

#[async_trait]
impl RequestRepository for StoreRequestRepository {
    async fn create_request(
        &self,
        requester_id: i64,
        description: &str,
        created: DateTime<Utc>,
    ) -> RepoResult<ItemRequest> {
        let row = sqlx::query_as::<_, RequestRow>(
            "INSERT INTO item_requests (description, requester_id, created_at) VALUES ($1, $2, $3) \
             RETURNING id, description, requester_id, created_at",
        )
        .bind(description)
        .bind(requester_id)
        .bind(created)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn get_request(&self, id: i64) -> RepoResult<Option<ItemRequest>> {
        let row = sqlx::query_as::<_, RequestRow>(
            "SELECT id, description, requester_id, created_at FROM item_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ItemRequest::from))
    }

    async fn list_by_requester(&self, requester_id: i64) -> RepoResult<Vec<ItemRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(
            "SELECT id, description, requester_id, created_at FROM item_requests \
             WHERE requester_id = $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(requester_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ItemRequest::from).collect())
    }

    async fn list_excluding_requester(&self, requester_id: i64) -> RepoResult<Vec<ItemRequest>> {
        let rows = sqlx::query_as::<_, RequestRow>(
            "SELECT id, description, requester_id, created_at FROM item_requests \
             WHERE requester_id <> $1 ORDER BY created_at DESC, id DESC",
        )
        .bind(requester_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ItemRequest::from).collect())
    }
}
