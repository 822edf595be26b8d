/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use todolist_api::{app::AppState, config::Config};
/// use todolist_shared::auth::password::PasswordHasher;
/// use todolist_shared::service::TodoService;
/// use todolist_shared::store::memory::MemoryStore;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let hasher = PasswordHasher::new(config.password)?;
/// let service = TodoService::from_store(Arc::new(MemoryStore::new(hasher)));
/// let app = todolist_api::app::build_router(AppState::new(service, config));
/// # Ok(())
/// # }
/// ```

use crate::{
    config::Config,
    error::{ApiError, METHOD_NOT_ALLOWED_MESSAGE, NOT_FOUND_MESSAGE},
    middleware::security::SecurityHeadersLayer,
};
use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use todolist_shared::service::TodoService;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// This is cloned for each request handler via Axum's `State` extractor.
/// Both fields are reference counted, so cloning is cheap.
#[derive(Clone)]
pub struct AppState {
    /// Task and user operations over the configured store
    pub service: TodoService,

    /// Application configuration
    pub config: Arc<Config>,
}

impl AppState {
    /// Creates new application state
    pub fn new(service: TodoService, config: Config) -> Self {
        Self {
            service,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET    /                  # Landing page (public)
/// ├── POST   /create_user       # Signup (public)
/// ├── GET    /tasks             # Basic auth (AuthContext) from here down
/// ├── GET    /tasks/:id
/// ├── PUT    /done/:id
/// ├── POST   /create_task
/// ├── DELETE /delete_task/:id
/// └── DELETE /delete_user
/// ```
///
/// # Middleware Stack
///
/// Applied in order (innermost first):
/// 1. JSON bodies for 405 responses
/// 2. Logging (tower-http TraceLayer)
/// 3. CORS (tower-http CorsLayer)
/// 4. Security headers
///
/// Authentication is not a layer: protected handlers take an
/// [`AuthContext`](crate::middleware::auth::AuthContext) argument, which is
/// only extracted once path and method have matched. A wrong method on a
/// protected path is therefore a 405 even without credentials.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let public_routes = Router::new()
        .route("/", get(routes::index::index))
        .route("/create_user", post(routes::users::create_user));

    let protected_routes = Router::new()
        .route("/tasks", get(routes::tasks::list_tasks))
        .route("/tasks/:id", get(routes::tasks::get_task))
        .route("/done/:id", put(routes::tasks::complete_task))
        .route("/create_task", post(routes::tasks::create_task))
        .route("/delete_task/:id", delete(routes::tasks::delete_task))
        .route("/delete_user", delete(routes::users::delete_user));

    let cors = cors_layer(&state.config.api.cors_origins);

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(not_found)
        .layer(axum::middleware::map_response(method_not_allowed_json))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

fn cors_layer(cors_origins: &[String]) -> CorsLayer {
    if cors_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}

async fn not_found() -> ApiError {
    ApiError::NotFound(NOT_FOUND_MESSAGE.to_string())
}

/// Replaces axum's empty 405 body with the JSON error shape, keeping `Allow`
async fn method_not_allowed_json(response: Response) -> Response {
    if response.status() != StatusCode::METHOD_NOT_ALLOWED {
        return response;
    }

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut json = ApiError::MethodNotAllowed(METHOD_NOT_ALLOWED_MESSAGE.to_string()).into_response();
    if let Some(allow) = allow {
        json.headers_mut().insert(header::ALLOW, allow);
    }
    json
}
