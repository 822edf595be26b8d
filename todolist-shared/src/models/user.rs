/// User model and database operations
///
/// Users authenticate with a login/password pair and own zero or more tasks.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE users (
///     id BIGSERIAL PRIMARY KEY,
///     login VARCHAR(64) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
///
/// CREATE UNIQUE INDEX idx_users_login ON users (login);
/// ```
///
/// # Example
///
/// ```no_run
/// use todolist_shared::models::user::{User, CreateUser};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     login: "alice".to_string(),
///     password_hash: "$argon2id$...".to_string(),
/// }).await?;
///
/// let found = User::find_by_login(&pool, "alice").await?;
/// assert_eq!(found.map(|u| u.id), Some(user.id));
/// # Ok(())
/// # }
/// ```

use serde::Serialize;
use sqlx::PgExecutor;

/// User model representing an account
///
/// Passwords are stored as Argon2id hashes, never in plaintext, and the hash
/// is never serialized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID, assigned by the store
    pub id: i64,

    /// Login name, unique across all users
    pub login: String,

    /// Argon2id password hash (PHC string)
    #[serde(skip_serializing)]
    pub password_hash: String,
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    /// Login name
    pub login: String,

    /// Argon2id password hash (NOT the plaintext password!)
    pub password_hash: String,
}

impl User {
    /// Inserts a new user and returns it with its generated ID
    ///
    /// # Errors
    ///
    /// Fails with a unique violation if the login is already taken.
    pub async fn create<'e, E>(executor: E, data: CreateUser) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (login, password_hash)
            VALUES ($1, $2)
            RETURNING id, login, password_hash
            "#,
        )
        .bind(data.login)
        .bind(data.password_hash)
        .fetch_one(executor)
        .await?;

        Ok(user)
    }

    /// Finds a user by login, `None` if no such user exists
    pub async fn find_by_login<'e, E>(executor: E, login: &str) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, login, password_hash
            FROM users
            WHERE login = $1
            "#,
        )
        .bind(login)
        .fetch_optional(executor)
        .await?;

        Ok(user)
    }

    /// Deletes a user by ID
    ///
    /// Returns true if a row was removed. Callers that need the owned tasks
    /// gone first should run this inside the same transaction as
    /// [`Task::delete_by_owner`](crate::models::task::Task::delete_by_owner).
    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
