/// Credential and task stores
///
/// The service layer only talks to storage through the [`CredentialStore`]
/// and [`TaskStore`] traits. Two backends implement both:
///
/// - [`postgres::PgStore`]: PostgreSQL through sqlx
/// - [`memory::MemoryStore`]: process-local state, used by tests and the
///   `memory` storage backend
///
/// Lookups that miss return `Ok(None)`; errors are reserved for the store
/// itself failing.

pub mod memory;
pub mod postgres;

use crate::auth::password::PasswordError;
use crate::models::task::{CreateTask, Task};
use crate::models::user::User;
use async_trait::async_trait;

/// Store result type alias
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors raised by a store backend
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A user with this login already exists
    #[error("login {0} is already taken")]
    Conflict(String),

    /// Database operation failed
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Password hashing or verification failed
    #[error(transparent)]
    Password(#[from] PasswordError),

    /// Backend refused the write
    #[error("Write rejected: {0}")]
    WriteRejected(String),
}

/// User records and credentials
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Finds the user with this login
    async fn find_by_login(&self, login: &str) -> StoreResult<Option<User>>;

    /// Checks a plaintext password against the user's stored hash
    async fn verify(&self, user: &User, password: &str) -> StoreResult<bool>;

    /// Hashes the password and persists a new user
    ///
    /// Fails with [`StoreError::Conflict`] if the login is taken.
    async fn create(&self, login: &str, password: &str) -> StoreResult<User>;

    /// Removes the user together with every task it owns
    ///
    /// Both deletions form one atomic unit: on failure neither the user nor
    /// any of its tasks are removed. Returns the number of tasks removed.
    async fn delete(&self, user: &User) -> StoreResult<u64>;
}

/// Task records, scoped by owner
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persists a new open task
    async fn create(&self, task: CreateTask) -> StoreResult<Task>;

    /// All tasks of a user in creation order
    async fn list_by_owner(&self, user_id: i64) -> StoreResult<Vec<Task>>;

    /// The task with this ID if it belongs to `user_id`
    async fn find_by_owner_and_id(&self, user_id: i64, task_id: i64) -> StoreResult<Option<Task>>;

    /// The task with this ID regardless of owner
    async fn find_by_id(&self, task_id: i64) -> StoreResult<Option<Task>>;

    /// Sets `done` and returns the stored task
    async fn mark_done(&self, task: &Task) -> StoreResult<Task>;

    /// Removes a single task
    async fn delete(&self, task: &Task) -> StoreResult<()>;
}

/// Maps unique violations on `users.login` to [`StoreError::Conflict`]
pub(crate) fn conflict_or_database(err: sqlx::Error, login: &str) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(login.to_string())
        }
        _ => StoreError::Database(err),
    }
}
