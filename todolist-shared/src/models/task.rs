/// Task model and database operations
///
/// A task belongs to exactly one user and is only ever completed, never
/// reopened.
///
/// # State Machine
///
/// ```text
/// open (done = false) → done (done = true)
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     title VARCHAR(64) NOT NULL,
///     description VARCHAR(256) NOT NULL,
///     deadline TIMESTAMP NOT NULL,
///     done BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # JSON
///
/// ```json
/// {
///   "id": 1,
///   "title": "Buy milk",
///   "description": "2 litres",
///   "deadline": "2020-03-13 10:00",
///   "done": false
/// }
/// ```

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::PgExecutor;

/// Text format of a task deadline, minute precision
pub const DEADLINE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Task model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID, assigned by the store
    pub id: i64,

    /// Owning user, set once at creation
    #[serde(skip)]
    pub user_id: i64,

    /// Short title
    pub title: String,

    /// Free-form description (may be empty)
    pub description: String,

    /// Deadline, serialized as `YYYY-MM-DD HH:MM`
    #[serde(with = "deadline_format")]
    pub deadline: NaiveDateTime,

    /// Completion flag
    pub done: bool,
}

/// Input for creating a new task
///
/// New tasks always start with `done = false`.
#[derive(Debug, Clone)]
pub struct CreateTask {
    /// Owning user
    pub user_id: i64,

    /// Task title
    pub title: String,

    /// Task description
    pub description: String,

    /// Parsed deadline
    pub deadline: NaiveDateTime,
}

mod deadline_format {
    use super::DEADLINE_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(deadline: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&deadline.format(DEADLINE_FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&text, DEADLINE_FORMAT).map_err(serde::de::Error::custom)
    }
}

impl Task {
    /// Inserts a new open task
    pub async fn create<'e, E>(executor: E, data: CreateTask) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(
            r#"
            INSERT INTO tasks (user_id, title, description, deadline, done)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING id, user_id, title, description, deadline, done
            "#,
        )
        .bind(data.user_id)
        .bind(data.title)
        .bind(data.description)
        .bind(data.deadline)
        .fetch_one(executor)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID without any ownership check
    pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, deadline, done
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID with owner isolation
    ///
    /// A task owned by somebody else is reported as absent.
    pub async fn find_by_id_and_owner<'e, E>(
        executor: E,
        id: i64,
        user_id: i64,
    ) -> Result<Option<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, deadline, done
            FROM tasks
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(id)
        .bind(user_id)
        .fetch_optional(executor)
        .await?;

        Ok(task)
    }

    /// Lists every task of a user in creation order
    pub async fn list_by_owner<'e, E>(executor: E, user_id: i64) -> Result<Vec<Self>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let tasks = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, deadline, done
            FROM tasks
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(executor)
        .await?;

        Ok(tasks)
    }

    /// Marks a task as done
    ///
    /// Completing an already completed task is not an error.
    pub async fn mark_done<'e, E>(executor: E, id: i64) -> Result<Self, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let task = sqlx::query_as::<_, Task>(
            r#"
            UPDATE tasks
            SET done = TRUE
            WHERE id = $1
            RETURNING id, user_id, title, description, deadline, done
            "#,
        )
        .bind(id)
        .fetch_one(executor)
        .await?;

        Ok(task)
    }

    /// Deletes a task by ID, returning true if a row was removed
    pub async fn delete<'e, E>(executor: E, id: i64) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Deletes every task owned by a user, returning how many were removed
    pub async fn delete_by_owner<'e, E>(executor: E, user_id: i64) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM tasks WHERE user_id = $1")
            .bind(user_id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected())
    }
}
