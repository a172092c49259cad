use async_trait::async_trait;
use shareit_core::item::{Item, NewItem};
use shareit_core::repository::{ItemRepository, RepoResult};
use sqlx::PgPool;

pub struct StoreItemRepository {
    pool: PgPool,
}

impl StoreItemRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ItemRow {
    id: i64,
    name: String,
    description: String,
    available: bool,
    owner_id: i64,
    request_id: Option<i64>,
}

impl From<ItemRow> for Item {
    fn from(row: ItemRow) -> Self {
        Item {
            id: row.id,
            name: row.name,
            description: row.description,
            available: row.available,
            owner_id: row.owner_id,
            request_id: row.request_id,
        }
    }
}

const ITEM_COLUMNS: &str = "id, name, description, available, owner_id, request_id";

/// Wraps `text` for `ILIKE`, escaping the pattern metacharacters.
pub(crate) fn contains_pattern(text: &str) -> String {
    let mut pattern = String::with_capacity(text.len() + 2);
    pattern.push('%');
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl ItemRepository for StoreItemRepository {
    async fn create_item(&self, owner_id: i64, item: &NewItem) -> RepoResult<Item> {
        let sql = format!(
            "INSERT INTO items (name, description, available, owner_id, request_id) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {}",
            ITEM_COLUMNS
        );
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(&item.name)
            .bind(&item.description)
            .bind(item.available)
            .bind(owner_id)
            .bind(item.request_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn get_item(&self, id: i64) -> RepoResult<Option<Item>> {
        let sql = format!("SELECT {} FROM items WHERE id = $1", ITEM_COLUMNS);
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Item::from))
    }

    async fn update_item(&self, item: &Item) -> RepoResult<Item> {
        let sql = format!(
            "UPDATE items SET name = $2, description = $3, available = $4 WHERE id = $1 RETURNING {}",
            ITEM_COLUMNS
        );
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(item.id)
            .bind(&item.name)
            .bind(&item.description)
            .bind(item.available)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.into())
    }

    async fn list_by_owner(&self, owner_id: i64) -> RepoResult<Vec<Item>> {
        let sql = format!("SELECT {} FROM items WHERE owner_id = $1 ORDER BY id", ITEM_COLUMNS);
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn search_available(&self, text: &str) -> RepoResult<Vec<Item>> {
        let sql = format!(
            "SELECT {} FROM items WHERE available AND (name ILIKE $1 OR description ILIKE $1) ORDER BY id",
            ITEM_COLUMNS
        );
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(contains_pattern(text))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }

    async fn list_by_requests(&self, request_ids: &[i64]) -> RepoResult<Vec<Item>> {
        let sql = format!("SELECT {} FROM items WHERE request_id = ANY($1) ORDER BY id", ITEM_COLUMNS);
        let rows = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(request_ids)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(Item::from).collect())
    }
}
