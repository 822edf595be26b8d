/// In-memory store backend
///
/// Users and tasks live behind one mutex, so a cascading user deletion is
/// atomic with respect to every other operation. IDs are assigned from
/// per-table counters starting at 1 and never reused.
///
/// Writes can be made to fail on demand with [`MemoryStore::fail_writes`],
/// which lets tests exercise the store-failure paths of the service.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use todolist_shared::auth::password::{PasswordHasher, PasswordParams};
/// use todolist_shared::service::TodoService;
/// use todolist_shared::store::memory::MemoryStore;
///
/// let hasher = PasswordHasher::new(PasswordParams::default()).unwrap();
/// let service = TodoService::from_store(Arc::new(MemoryStore::new(hasher)));
/// ```

use super::{CredentialStore, StoreError, StoreResult, TaskStore};
use crate::auth::password::PasswordHasher;
use crate::models::task::{CreateTask, Task};
use crate::models::user::User;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<i64, User>,
    tasks: BTreeMap<i64, Task>,
    last_user_id: i64,
    last_task_id: i64,
    fail_writes: bool,
}

impl MemoryState {
    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes {
            return Err(StoreError::WriteRejected("store is failing writes".to_string()));
        }
        Ok(())
    }
}

/// Process-local store; clones share the same state
#[derive(Debug, Clone)]
pub struct MemoryStore {
    state: Arc<Mutex<MemoryState>>,
    hasher: PasswordHasher,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new(hasher: PasswordHasher) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            hasher,
        }
    }

    /// Makes every subsequent write fail (or succeed again)
    pub async fn fail_writes(&self, fail: bool) {
        self.state.lock().await.fail_writes = fail;
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    /// Number of stored tasks across all users
    pub async fn task_count(&self) -> usize {
        self.state.lock().await.tasks.len()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_login(&self, login: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.login == login).cloned())
    }

    async fn verify(&self, user: &User, password: &str) -> StoreResult<bool> {
        Ok(self.hasher.verify(password, &user.password_hash)?)
    }

    async fn create(&self, login: &str, password: &str) -> StoreResult<User> {
        // Hash outside the lock
        let password_hash = self.hasher.hash(password)?;

        let mut state = self.state.lock().await;
        state.check_writable()?;

        if state.users.values().any(|u| u.login == login) {
            return Err(StoreError::Conflict(login.to_string()));
        }

        state.last_user_id += 1;
        let user = User {
            id: state.last_user_id,
            login: login.to_string(),
            password_hash,
        };
        state.users.insert(user.id, user.clone());

        debug!(user_id = user.id, "User stored in memory");
        Ok(user)
    }

    async fn delete(&self, user: &User) -> StoreResult<u64> {
        let mut state = self.state.lock().await;
        state.check_writable()?;

        if !state.users.contains_key(&user.id) {
            return Err(StoreError::WriteRejected(format!("user {} vanished", user.id)));
        }

        let before = state.tasks.len();
        state.tasks.retain(|_, task| task.user_id != user.id);
        let removed = (before - state.tasks.len()) as u64;
        state.users.remove(&user.id);

        debug!(user_id = user.id, tasks_removed = removed, "User deleted from memory");
        Ok(removed)
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn create(&self, data: CreateTask) -> StoreResult<Task> {
        let mut state = self.state.lock().await;
        state.check_writable()?;

        state.last_task_id += 1;
        let task = Task {
            id: state.last_task_id,
            user_id: data.user_id,
            title: data.title,
            description: data.description,
            deadline: data.deadline,
            done: false,
        };
        state.tasks.insert(task.id, task.clone());

        Ok(task)
    }

    async fn list_by_owner(&self, user_id: i64) -> StoreResult<Vec<Task>> {
        let state = self.state.lock().await;
        Ok(state
            .tasks
            .values()
            .filter(|task| task.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_by_owner_and_id(&self, user_id: i64, task_id: i64) -> StoreResult<Option<Task>> {
        let state = self.state.lock().await;
        Ok(state
            .tasks
            .get(&task_id)
            .filter(|task| task.user_id == user_id)
            .cloned())
    }

    async fn find_by_id(&self, task_id: i64) -> StoreResult<Option<Task>> {
        let state = self.state.lock().await;
        Ok(state.tasks.get(&task_id).cloned())
    }

    async fn mark_done(&self, task: &Task) -> StoreResult<Task> {
        let mut state = self.state.lock().await;
        state.check_writable()?;

        let stored = state
            .tasks
            .get_mut(&task.id)
            .ok_or_else(|| StoreError::WriteRejected(format!("task {} vanished", task.id)))?;
        stored.done = true;

        Ok(stored.clone())
    }

    async fn delete(&self, task: &Task) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        state.check_writable()?;

        state
            .tasks
            .remove(&task.id)
            .map(|_| ())
            .ok_or_else(|| StoreError::WriteRejected(format!("task {} vanished", task.id)))
    }
}
