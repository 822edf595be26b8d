/// PostgreSQL store backend
///
/// Wraps a [`PgPool`] and the model queries. Cascading user deletion runs in a
/// single transaction that is explicitly rolled back on any failure.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use todolist_shared::auth::password::{PasswordHasher, PasswordParams};
/// use todolist_shared::service::TodoService;
/// use todolist_shared::store::postgres::PgStore;
/// use sqlx::PgPool;
///
/// # fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = PasswordHasher::new(PasswordParams::default())?;
/// let store = Arc::new(PgStore::new(pool, hasher));
/// let service = TodoService::from_store(store);
/// # Ok(())
/// # }
/// ```

use super::{conflict_or_database, CredentialStore, StoreResult, TaskStore};
use crate::auth::password::PasswordHasher;
use crate::models::task::{CreateTask, Task};
use crate::models::user::{CreateUser, User};
use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, warn};

/// Store backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
    hasher: PasswordHasher,
}

impl PgStore {
    /// Creates a store over an existing pool
    pub fn new(pool: PgPool, hasher: PasswordHasher) -> Self {
        Self { pool, hasher }
    }

    /// The underlying pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn delete_user_tx(conn: &mut PgConnection, user_id: i64) -> Result<u64, sqlx::Error> {
        let removed = Task::delete_by_owner(&mut *conn, user_id).await?;
        if !User::delete(&mut *conn, user_id).await? {
            return Err(sqlx::Error::RowNotFound);
        }
        Ok(removed)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        Ok(User::find_by_login(&self.pool, login).await?)
    }

    async fn verify(&self, user: &User, password: &str) -> StoreResult<bool> {
        Ok(self.hasher.verify(password, &user.password_hash)?)
    }

    async fn create(&self, login: &str, password: &str) -> StoreResult<User> {
        let password_hash = self.hasher.hash(password)?;

        let user = User::create(
            &self.pool,
            CreateUser {
                login: login.to_string(),
                password_hash,
            },
        )
        .await
        .map_err(|e| conflict_or_database(e, login))?;

        debug!(user_id = user.id, "User row inserted");
        Ok(user)
    }

    async fn delete(&self, user: &User) -> StoreResult<u64> {
        let mut tx = self.pool.begin().await?;

        match Self::delete_user_tx(&mut tx, user.id).await {
            Ok(removed) => {
                tx.commit().await?;
                debug!(user_id = user.id, tasks_removed = removed, "User and tasks deleted");
                Ok(removed)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(user_id = user.id, "Rollback failed: {}", rollback_err);
                }
                Err(e.into())
            }
        }
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn create(&self, task: CreateTask) -> StoreResult<Task> {
        let task = Task::create(&self.pool, task).await?;
        debug!(task_id = task.id, user_id = task.user_id, "Task row inserted");
        Ok(task)
    }

    async fn list_by_owner(&self, user_id: i64) -> StoreResult<Vec<Task>> {
        Ok(Task::list_by_owner(&self.pool, user_id).await?)
    }

    async fn find_by_owner_and_id(&self, user_id: i64, task_id: i64) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id_and_owner(&self.pool, task_id, user_id).await?)
    }

    async fn find_by_id(&self, task_id: i64) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, task_id).await?)
    }

    async fn mark_done(&self, task: &Task) -> StoreResult<Task> {
        Ok(Task::mark_done(&self.pool, task.id).await?)
    }

    async fn delete(&self, task: &Task) -> StoreResult<()> {
        if !Task::delete(&self.pool, task.id).await? {
            return Err(sqlx::Error::RowNotFound.into());
        }
        Ok(())
    }
}
