/// User endpoints
///
/// # Endpoints
///
/// - `POST /create_user` - Sign up (public)
/// - `DELETE /delete_user` - Delete the authenticated user and all of its tasks

use crate::{app::AppState, error::ApiResult, middleware::auth::AuthContext};
use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use serde::Serialize;
use todolist_shared::validation::{parse_payload, validate_signup};

/// Status/message body shared by both user endpoints
#[derive(Debug, Serialize)]
pub struct UserMessageResponse {
    pub status: u16,
    pub message: String,
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /create_user
/// Content-Type: application/json
///
/// {"login": "alice", "password": "secret"}
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Missing body or field, empty login, login taken
/// - `500 Internal Server Error`: The user could not be stored
pub async fn create_user(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<UserMessageResponse>)> {
    let payload = parse_payload(&body)?;
    let command = validate_signup(&payload)?;
    let user = state.service.signup(command).await?;

    Ok((
        StatusCode::CREATED,
        Json(UserMessageResponse {
            status: StatusCode::CREATED.as_u16(),
            message: format!("user with login={} created", user.login),
        }),
    ))
}

/// Delete the authenticated user
///
/// The user's tasks go with it in the same atomic unit; on failure nothing is
/// removed.
pub async fn delete_user(
    State(state): State<AppState>,
    auth: AuthContext,
) -> ApiResult<Json<UserMessageResponse>> {
    let login = auth.user.login;
    state.service.delete_user(&login).await?;

    Ok(Json(UserMessageResponse {
        status: StatusCode::OK.as_u16(),
        message: format!("user {} was deleted", login),
    }))
}
