use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shareit_core::item::{Comment, NewComment};
use shareit_core::repository::{CommentRepository, RepoResult};
use sqlx::PgPool;

pub struct StoreCommentRepository {
    pool: PgPool,
}

impl StoreCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    text: String,
    item_id: i64,
    author_id: i64,
    author_name: String,
    created_at: DateTime<Utc>,
}

impl From<CommentRow> for Comment {
    fn from(row: CommentRow) -> Self {
        Comment {
            id: row.id,
            text: row.text,
            item_id: row.item_id,
            author_id: row.author_id,
            author_name: row.author_name,
            created: row.created_at,
        }
    }
}

#[async_trait]
impl CommentRepository for StoreCommentRepository {
    async fn create_comment(&self, comment: &NewComment) -> RepoResult<Comment> {
        let row = sqlx::query_as::<_, CommentRow>(
            r#"
            WITH inserted AS (
                INSERT INTO comments (text, item_id, author_id, created_at)
                VALUES ($1, $2, $3, $4)
                RETURNING id, text, item_id, author_id, created_at
            )
            SELECT c.id, c.text, c.item_id, c.author_id, u.name AS author_name, c.created_at
            FROM inserted c
            JOIN users u ON u.id = c.author_id
            "#,
        )
        .bind(&comment.text)
        .bind(comment.item_id)
        .bind(comment.author_id)
        .bind(comment.created)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_for_items(&self, item_ids: &[i64]) -> RepoResult<Vec<Comment>> {
        let rows = sqlx::query_as::<_, CommentRow>(
            r#"
            SELECT c.id, c.text, c.item_id, c.author_id, u.name AS author_name, c.created_at
            FROM comments c
            JOIN users u ON u.id = c.author_id
            WHERE c.item_id = ANY($1)
            ORDER BY c.created_at DESC, c.id DESC
            "#,
        )
        .bind(item_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Comment::from).collect())
    }
}
