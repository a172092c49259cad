use async_trait::async_trait;
use shareit_core::repository::{RepoError, RepoResult, UserRepository};
use shareit_core::user::{NewUser, User};
use shareit_core::CoreError;
use sqlx::PgPool;

pub struct StoreUserRepository {
    pool: PgPool,
}

impl StoreUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    name: String,
    email: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User { id: row.id, name: row.name, email: row.email }
    }
}

/// `uq_users_email` surfaces as `AlreadyExists`; everything else passes through.
fn map_write_error(err: sqlx::Error) -> RepoError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => Box::new(CoreError::AlreadyExists(
            "User with this email already exists".to_string(),
        )),
        _ => Box::new(err),
    }
}

#[async_trait]
impl UserRepository for StoreUserRepository {
    async fn create_user(&self, user: &NewUser) -> RepoResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (name, email) VALUES ($1, $2) RETURNING id, name, email",
        )
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.into())
    }

    async fn get_user(&self, id: i64) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>("SELECT id, name, email FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(User::from))
    }

    async fn update_user(&self, user: &User) -> RepoResult<User> {
        let row = sqlx::query_as::<_, UserRow>(
            "UPDATE users SET name = $2, email = $3 WHERE id = $1 RETURNING id, name, email",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&self.pool)
        .await
        .map_err(map_write_error)?;

        Ok(row.into())
    }

    async fn delete_user(&self, id: i64) -> RepoResult<()> {
        // Items, bookings, comments and requests follow via ON DELETE CASCADE.
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
