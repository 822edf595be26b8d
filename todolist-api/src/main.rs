//! # Todolist API Server
//!
//! HTTP server for the multi-user to-do list service.
//!
//! ## Architecture
//!
//! The API server is built with Axum and provides:
//! - Signup and account deletion
//! - Task listing, creation, completion and deletion (HTTP Basic auth)
//! - A PostgreSQL store, or an in-memory one for local runs
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/todolist cargo run -p todolist-api
//! STORAGE_BACKEND=memory cargo run -p todolist-api
//! ```

use std::sync::Arc;
use todolist_api::app::{build_router, AppState};
use todolist_api::config::{Config, StorageBackend};
use todolist_shared::auth::password::PasswordHasher;
use todolist_shared::db::{self, pool::DatabaseConfig};
use todolist_shared::service::TodoService;
use todolist_shared::store::{memory::MemoryStore, postgres::PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "todolist_api=debug,todolist_shared=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "Todolist API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;
    let hasher = PasswordHasher::new(config.password)?;

    let (service, pool) = match config.database.backend {
        StorageBackend::Postgres => {
            let url = config
                .database
                .url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

            db::migrations::ensure_database_exists(&url).await?;
            let pool = db::pool::create_pool(DatabaseConfig {
                url,
                max_connections: config.database.max_connections,
                ..Default::default()
            })
            .await?;
            db::migrations::run_migrations(&pool).await?;

            let store = Arc::new(PgStore::new(pool.clone(), hasher));
            (TodoService::from_store(store), Some(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on shutdown");
            (TodoService::from_store(Arc::new(MemoryStore::new(hasher))), None)
        }
    };

    tracing::info!(
        delete_scope = %config.tasks.delete_scope,
        "Task deletion scope configured"
    );

    let bind_address = config.bind_address();
    let app = build_router(AppState::new(service, config));

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(pool) = pool {
        db::pool::close_pool(pool).await;
    }
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received, exiting...");
}
