/// Task and user lifecycle operations
///
/// [`TodoService`] applies validated commands against the credential and task
/// stores it was constructed with, and turns store failures into
/// [`ServiceError`] outcomes:
///
/// | Outcome                   | HTTP class |
/// |---------------------------|------------|
/// | `Ok(value)`               | 200 / 201  |
/// | `ServiceError::Data`      | 400        |
/// | `ServiceError::NotFound`  | 404        |
/// | `ServiceError::Store`     | 500        |
///
/// Every task operation is scoped to its owner, except `delete_task` under
/// [`TaskDeleteScope::Any`].

use crate::models::task::{CreateTask, Task};
use crate::models::user::User;
use crate::store::{CredentialStore, StoreError, TaskStore};
use crate::validation::{parse_deadline, CreateTaskCommand, SignupCommand};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Service result type alias
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Failure outcome of a service operation
///
/// The `Display` text is the client-facing message; store internals are only
/// logged.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ServiceError {
    /// The request data was rejected
    #[error("{0}")]
    Data(String),

    /// The referenced user or task does not exist (for this caller)
    #[error("{0}")]
    NotFound(String),

    /// The datastore failed; nothing was committed
    #[error("{0}")]
    Store(String),
}

/// Why a Basic-auth credential pair was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    /// No user has this login
    #[error("unauthorized access")]
    UnknownLogin,

    /// The login exists but the password does not match
    #[error("wrong password")]
    WrongPassword,

    /// Credentials could not be checked
    #[error("failed to check credentials")]
    Store,
}

/// Who may delete a task by ID
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TaskDeleteScope {
    /// Only the owner; other users' tasks look absent
    #[default]
    Owner,

    /// Any authenticated user may delete any task
    Any,
}

impl FromStr for TaskDeleteScope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owner" => Ok(Self::Owner),
            "any" => Ok(Self::Any),
            other => Err(format!("unknown task delete scope '{}' (expected owner or any)", other)),
        }
    }
}

impl fmt::Display for TaskDeleteScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Owner => write!(f, "owner"),
            Self::Any => write!(f, "any"),
        }
    }
}

/// Orchestrates the credential and task stores
#[derive(Clone)]
pub struct TodoService {
    users: Arc<dyn CredentialStore>,
    tasks: Arc<dyn TaskStore>,
}

impl TodoService {
    /// Creates a service over explicit stores
    pub fn new(users: Arc<dyn CredentialStore>, tasks: Arc<dyn TaskStore>) -> Self {
        Self { users, tasks }
    }

    /// Creates a service over one backend serving both roles
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CredentialStore + TaskStore + 'static,
    {
        Self::new(store.clone(), store)
    }

    /// Resolves Basic-auth credentials to a user
    pub async fn authenticate(&self, login: &str, password: &str) -> Result<User, AuthFailure> {
        let user = self
            .users
            .find_by_login(login)
            .await
            .map_err(|e| {
                error!(login, "Credential lookup failed: {}", e);
                AuthFailure::Store
            })?
            .ok_or(AuthFailure::UnknownLogin)?;

        let valid = self.users.verify(&user, password).await.map_err(|e| {
            error!(user_id = user.id, "Password verification failed: {}", e);
            AuthFailure::Store
        })?;

        if !valid {
            warn!(user_id = user.id, "Wrong password");
            return Err(AuthFailure::WrongPassword);
        }

        Ok(user)
    }

    /// Registers a new user
    ///
    /// The lookup before the insert is advisory; a concurrent signup that
    /// wins the race surfaces as the same "busy" outcome through the store's
    /// uniqueness constraint.
    pub async fn signup(&self, command: SignupCommand) -> ServiceResult<User> {
        let login = command.login;
        let busy = || ServiceError::Data(format!("this login={} is busy", login));

        match self.users.find_by_login(&login).await {
            Ok(Some(_)) => return Err(busy()),
            Ok(None) => {}
            Err(e) => {
                error!(login = %login, "Login lookup failed: {}", e);
                return Err(ServiceError::Store(format!(
                    "failed to add a user with login={}!",
                    login
                )));
            }
        }

        match self.users.create(&login, &command.password).await {
            Ok(user) => {
                info!(user_id = user.id, login = %user.login, "User created");
                Ok(user)
            }
            Err(StoreError::Conflict(_)) => Err(busy()),
            Err(e) => {
                error!(login = %login, "Failed to create user: {}", e);
                Err(ServiceError::Store(format!(
                    "failed to add a user with login={}!",
                    login
                )))
            }
        }
    }

    /// Creates an open task owned by `owner`
    pub async fn create_task(&self, command: CreateTaskCommand, owner: &User) -> ServiceResult<Task> {
        let deadline =
            parse_deadline(&command.deadline).map_err(|e| ServiceError::Data(e.to_string()))?;

        let title = command.title;
        let created = self
            .tasks
            .create(CreateTask {
                user_id: owner.id,
                title: title.clone(),
                description: command.description,
                deadline,
            })
            .await;

        match created {
            Ok(task) => {
                info!(task_id = task.id, user_id = owner.id, "Task created");
                Ok(task)
            }
            Err(e) => {
                error!(user_id = owner.id, "Failed to create task: {}", e);
                Err(ServiceError::Store(format!("failed to create an task {}!", title)))
            }
        }
    }

    /// All tasks of `owner`
    pub async fn list_tasks(&self, owner: &User) -> ServiceResult<Vec<Task>> {
        self.tasks.list_by_owner(owner.id).await.map_err(|e| {
            error!(user_id = owner.id, "Failed to list tasks: {}", e);
            ServiceError::Store("failed to load the tasks!".to_string())
        })
    }

    /// One task of `owner`
    pub async fn get_task(&self, owner: &User, task_id: i64) -> ServiceResult<Task> {
        self.find_owned(owner, task_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("task {} was not found", task_id)))
    }

    /// Marks a task of `owner` as completed
    ///
    /// Completing an already completed task succeeds again.
    pub async fn complete_task(&self, owner: &User, task_id: i64) -> ServiceResult<Task> {
        let task = self.find_owned(owner, task_id).await?.ok_or_else(|| {
            ServiceError::NotFound(format!("the task with id={} doesn't exist", task_id))
        })?;

        match self.tasks.mark_done(&task).await {
            Ok(task) => {
                info!(task_id, user_id = owner.id, "Task completed");
                Ok(task)
            }
            Err(e) => {
                error!(task_id, "Failed to complete task: {}", e);
                Err(ServiceError::Store(format!(
                    "failed to mark the task with id={} as completed!",
                    task_id
                )))
            }
        }
    }

    /// Deletes a task by ID
    ///
    /// Under [`TaskDeleteScope::Owner`] a task owned by someone other than
    /// `caller` is reported as not found; under [`TaskDeleteScope::Any`] the
    /// owner is not checked.
    pub async fn delete_task(
        &self,
        caller: &User,
        task_id: i64,
        scope: TaskDeleteScope,
    ) -> ServiceResult<Task> {
        let found = match scope {
            TaskDeleteScope::Owner => self.find_owned(caller, task_id).await?,
            TaskDeleteScope::Any => self.tasks.find_by_id(task_id).await.map_err(|e| {
                error!(task_id, "Task lookup failed: {}", e);
                ServiceError::Store("failed to delete the task!".to_string())
            })?,
        };

        let task =
            found.ok_or_else(|| ServiceError::NotFound(format!("task {} was not found", task_id)))?;

        if task.user_id != caller.id {
            warn!(task_id, owner_id = task.user_id, caller_id = caller.id, "Deleting a task of another user");
        }

        match self.tasks.delete(&task).await {
            Ok(()) => {
                info!(task_id, "Task deleted");
                Ok(task)
            }
            Err(e) => {
                error!(task_id, "Failed to delete task: {}", e);
                Err(ServiceError::Store("failed to delete the task!".to_string()))
            }
        }
    }

    /// Deletes a user and, in the same atomic unit, all of its tasks
    pub async fn delete_user(&self, login: &str) -> ServiceResult<u64> {
        let user = self
            .users
            .find_by_login(login)
            .await
            .map_err(|e| {
                error!(login, "Login lookup failed: {}", e);
                ServiceError::Store("failed to delete the user!".to_string())
            })?
            .ok_or_else(|| ServiceError::NotFound(format!("user {} was not found", login)))?;

        match self.users.delete(&user).await {
            Ok(removed) => {
                info!(user_id = user.id, tasks_removed = removed, "User deleted");
                Ok(removed)
            }
            Err(e) => {
                error!(user_id = user.id, "Failed to delete user: {}", e);
                Err(ServiceError::Store("failed to delete the user!".to_string()))
            }
        }
    }

    async fn find_owned(&self, owner: &User, task_id: i64) -> ServiceResult<Option<Task>> {
        self.tasks
            .find_by_owner_and_id(owner.id, task_id)
            .await
            .map_err(|e| {
                error!(task_id, user_id = owner.id, "Task lookup failed: {}", e);
                ServiceError::Store(format!("failed to load the task with id={}!", task_id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::{PasswordHasher, PasswordParams};
    use crate::store::memory::MemoryStore;

    fn setup() -> (TodoService, Arc<MemoryStore>) {
        let hasher = PasswordHasher::new(PasswordParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap();
        let store = Arc::new(MemoryStore::new(hasher));
        (TodoService::from_store(store.clone()), store)
    }

    fn signup_command(login: &str) -> SignupCommand {
        SignupCommand {
            login: login.to_string(),
            password: "pass".to_string(),
        }
    }

    fn task_command(title: &str, deadline: &str) -> CreateTaskCommand {
        CreateTaskCommand {
            title: title.to_string(),
            description: "test description".to_string(),
            deadline: deadline.to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_twice_reports_busy_login() {
        let (service, store) = setup();

        let first = service.signup(signup_command("test_user")).await.unwrap();
        let err = service.signup(signup_command("test_user")).await.unwrap_err();

        assert_eq!(err, ServiceError::Data("this login=test_user is busy".to_string()));
        assert_eq!(store.user_count().await, 1);
        assert_eq!(service.authenticate("test_user", "pass").await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_signup_store_failure() {
        let (service, store) = setup();
        store.fail_writes(true).await;

        let err = service.signup(signup_command("alice")).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::Store("failed to add a user with login=alice!".to_string())
        );
    }

    #[tokio::test]
    async fn test_authenticate_outcomes() {
        let (service, _) = setup();
        service.signup(signup_command("alice")).await.unwrap();

        assert_eq!(
            service.authenticate("nobody", "pass").await.unwrap_err(),
            AuthFailure::UnknownLogin
        );
        assert_eq!(
            service.authenticate("alice", "wrong").await.unwrap_err(),
            AuthFailure::WrongPassword
        );
        assert_eq!(service.authenticate("alice", "pass").await.unwrap().login, "alice");
    }

    #[tokio::test]
    async fn test_create_task_with_bad_deadline() {
        let (service, store) = setup();
        let owner = service.signup(signup_command("alice")).await.unwrap();

        let err = service
            .create_task(task_command("t", "13.03.2020"), &owner)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ServiceError::Data("wrong format deadline (yyyy-mm-dd hh:mm)".to_string())
        );
        assert_eq!(store.task_count().await, 0);
    }

    #[tokio::test]
    async fn test_create_task_starts_open() {
        let (service, _) = setup();
        let owner = service.signup(signup_command("alice")).await.unwrap();

        let task = service
            .create_task(task_command("test task", "2020-03-13 10:00"), &owner)
            .await
            .unwrap();

        assert_eq!(task.user_id, owner.id);
        assert!(!task.done);
        assert_eq!(task.deadline.format("%Y-%m-%d %H:%M").to_string(), "2020-03-13 10:00");
    }

    #[tokio::test]
    async fn test_create_task_store_failure() {
        let (service, store) = setup();
        let owner = service.signup(signup_command("alice")).await.unwrap();
        store.fail_writes(true).await;

        let err = service
            .create_task(task_command("groceries", "2020-03-13 10:00"), &owner)
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::Store("failed to create an task groceries!".to_string()));
    }

    #[tokio::test]
    async fn test_fresh_user_has_no_tasks() {
        let (service, _) = setup();
        let owner = service.signup(signup_command("alice")).await.unwrap();

        assert!(service.list_tasks(&owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tasks_are_owner_scoped() {
        let (service, _) = setup();
        let alice = service.signup(signup_command("alice")).await.unwrap();
        let bob = service.signup(signup_command("bob")).await.unwrap();
        let task = service
            .create_task(task_command("alice's", "2020-03-13 10:00"), &alice)
            .await
            .unwrap();

        assert!(service.list_tasks(&bob).await.unwrap().is_empty());
        assert_eq!(
            service.get_task(&bob, task.id).await.unwrap_err(),
            ServiceError::NotFound(format!("task {} was not found", task.id))
        );
        assert_eq!(
            service.complete_task(&bob, task.id).await.unwrap_err(),
            ServiceError::NotFound(format!("the task with id={} doesn't exist", task.id))
        );
        assert!(!service.get_task(&alice, task.id).await.unwrap().done);
    }

    #[tokio::test]
    async fn test_complete_task_twice() {
        let (service, _) = setup();
        let owner = service.signup(signup_command("alice")).await.unwrap();
        let task = service
            .create_task(task_command("t", "2020-03-13 10:00"), &owner)
            .await
            .unwrap();

        assert!(service.complete_task(&owner, task.id).await.unwrap().done);
        assert!(service.complete_task(&owner, task.id).await.unwrap().done);
    }

    #[tokio::test]
    async fn test_complete_task_store_failure() {
        let (service, store) = setup();
        let owner = service.signup(signup_command("alice")).await.unwrap();
        let task = service
            .create_task(task_command("t", "2020-03-13 10:00"), &owner)
            .await
            .unwrap();
        store.fail_writes(true).await;

        let err = service.complete_task(&owner, task.id).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::Store(format!("failed to mark the task with id={} as completed!", task.id))
        );
    }

    #[tokio::test]
    async fn test_delete_task_scopes() {
        let (service, _) = setup();
        let alice = service.signup(signup_command("alice")).await.unwrap();
        let bob = service.signup(signup_command("bob")).await.unwrap();
        let task = service
            .create_task(task_command("t", "2020-03-13 10:00"), &alice)
            .await
            .unwrap();

        let err = service
            .delete_task(&bob, task.id, TaskDeleteScope::Owner)
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::NotFound(format!("task {} was not found", task.id)));

        let deleted = service
            .delete_task(&bob, task.id, TaskDeleteScope::Any)
            .await
            .unwrap();
        assert_eq!(deleted.id, task.id);
        assert!(service.get_task(&alice, task.id).await.is_err());
    }

    #[tokio::test]
    async fn test_delete_missing_task() {
        let (service, _) = setup();
        let alice = service.signup(signup_command("alice")).await.unwrap();

        let err = service
            .delete_task(&alice, 10, TaskDeleteScope::Owner)
            .await
            .unwrap_err();
        assert_eq!(err, ServiceError::NotFound("task 10 was not found".to_string()));
    }

    #[tokio::test]
    async fn test_delete_user_removes_tasks() {
        let (service, store) = setup();
        let alice = service.signup(signup_command("alice")).await.unwrap();
        let bob = service.signup(signup_command("bob")).await.unwrap();
        let task = service
            .create_task(task_command("t", "2020-03-13 10:00"), &alice)
            .await
            .unwrap();
        service
            .create_task(task_command("u", "2020-03-14 10:00"), &alice)
            .await
            .unwrap();

        assert_eq!(service.delete_user("alice").await.unwrap(), 2);
        assert_eq!(store.task_count().await, 0);
        assert!(service
            .delete_task(&bob, task.id, TaskDeleteScope::Any)
            .await
            .is_err());
        assert_eq!(
            service.delete_user("alice").await.unwrap_err(),
            ServiceError::NotFound("user alice was not found".to_string())
        );
    }

    #[tokio::test]
    async fn test_delete_user_failure_keeps_everything() {
        let (service, store) = setup();
        let alice = service.signup(signup_command("alice")).await.unwrap();
        service
            .create_task(task_command("t", "2020-03-13 10:00"), &alice)
            .await
            .unwrap();
        store.fail_writes(true).await;

        let err = service.delete_user("alice").await.unwrap_err();
        assert_eq!(err, ServiceError::Store("failed to delete the user!".to_string()));
        assert_eq!(store.user_count().await, 1);
        assert_eq!(store.task_count().await, 1);
    }

    #[test]
    fn test_delete_scope_parsing() {
        assert_eq!("owner".parse::<TaskDeleteScope>(), Ok(TaskDeleteScope::Owner));
        assert_eq!(" ANY ".parse::<TaskDeleteScope>(), Ok(TaskDeleteScope::Any));
        assert!("admin".parse::<TaskDeleteScope>().is_err());
        assert_eq!(TaskDeleteScope::default(), TaskDeleteScope::Owner);
        assert_eq!(TaskDeleteScope::Any.to_string(), "any");
    }
}
