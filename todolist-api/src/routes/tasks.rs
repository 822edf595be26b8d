/// Task endpoints
///
/// Every endpoint here sits behind Basic authentication and only ever sees the
/// caller's own tasks. The one exception is `DELETE /delete_task/:id` when the
/// server runs with `TASK_DELETE_SCOPE=any`.
///
/// # Endpoints
///
/// - `GET /tasks` - List the caller's tasks
/// - `GET /tasks/:id` - Fetch one task
/// - `PUT /done/:id` - Mark a task as completed
/// - `POST /create_task` - Create a task
/// - `DELETE /delete_task/:id` - Delete a task

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, NOT_FOUND_MESSAGE},
    middleware::auth::AuthContext,
};
use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    Json,
};
use serde::Serialize;
use todolist_shared::models::task::Task;
use todolist_shared::validation::{parse_payload, validate_task_create};

/// Numeric task ID taken from the path
///
/// Anything other than a plain run of ASCII digits that fits in an `i64` is
/// treated as an unknown route (404), never as a bad request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(pub i64);

#[async_trait]
impl<S> FromRequestParts<S> for TaskId
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ApiError::NotFound(NOT_FOUND_MESSAGE.to_string()))?;

        parse_task_id(&raw)
            .map(TaskId)
            .ok_or_else(|| ApiError::NotFound(NOT_FOUND_MESSAGE.to_string()))
    }
}

fn parse_task_id(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// `GET /tasks` response
#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
}

/// `PUT /done/:id` response
#[derive(Debug, Serialize)]
pub struct CompleteTaskResponse {
    pub status: u16,
    pub message: String,
    pub task: Task,
}

/// `POST /create_task` response
#[derive(Debug, Serialize)]
pub struct CreateTaskResponse {
    pub status: u16,
    pub task: Task,
}

/// `DELETE /delete_task/:id` response
#[derive(Debug, Serialize)]
pub struct DeleteTaskResponse {
    pub status: u16,
    pub message: String,
}

/// List all tasks of the authenticated user
///
/// # Response
///
/// ```json
/// {
///   "tasks": [
///     {"id": 1, "title": "t", "description": "d", "deadline": "2020-03-13 10:00", "done": false}
///   ]
/// }
/// ```
pub async fn list_tasks(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<TaskListResponse>> {
    let tasks = state.service.list_tasks(&auth.user).await?;
    Ok(Json(TaskListResponse { tasks }))
}

/// Fetch one task of the authenticated user
///
/// # Errors
///
/// - `404 Not Found`: No such task, or it belongs to someone else
pub async fn get_task(
    State(state): State<AppState>,
    auth: AuthContext,
    TaskId(task_id): TaskId,
) -> ApiResult<Json<Task>> {
    let task = state.service.get_task(&auth.user, task_id).await?;
    Ok(Json(task))
}

/// Mark a task as completed
///
/// Completing an already completed task succeeds again with the same body.
pub async fn complete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    TaskId(task_id): TaskId,
) -> ApiResult<Json<CompleteTaskResponse>> {
    let task = state.service.complete_task(&auth.user, task_id).await?;

    Ok(Json(CompleteTaskResponse {
        status: StatusCode::OK.as_u16(),
        message: format!("the task with id={} is marked as completed", task.id),
        task,
    }))
}

/// Create a task
///
/// # Endpoint
///
/// ```text
/// POST /create_task
/// Content-Type: application/json
///
/// {
///   "title": "groceries",
///   "description": "milk, bread",
///   "deadline": "2020-03-13 10:00"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing body, missing or non-string field, empty
///   title, or a deadline not in `YYYY-MM-DD HH:MM` form
/// - `500 Internal Server Error`: The task could not be stored
pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthContext,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<CreateTaskResponse>)> {
    let payload = parse_payload(&body)?;
    let command = validate_task_create(&payload)?;
    let task = state.service.create_task(command, &auth.user).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateTaskResponse {
            status: StatusCode::CREATED.as_u16(),
            task,
        }),
    ))
}

/// Delete a task
///
/// Scope comes from configuration: under `owner` another user's task is
/// reported as not found, under `any` it is deleted.
pub async fn delete_task(
    State(state): State<AppState>,
    auth: AuthContext,
    TaskId(task_id): TaskId,
) -> ApiResult<Json<DeleteTaskResponse>> {
    let scope = state.config.tasks.delete_scope;
    let task = state.service.delete_task(&auth.user, task_id, scope).await?;

    Ok(Json(DeleteTaskResponse {
        status: StatusCode::OK.as_u16(),
        message: format!("task {} was deleted", task.id),
    }))
}
