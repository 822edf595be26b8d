/// Configuration management for the API server
///
/// This module loads configuration from environment variables (and a `.env`
/// file when present) into a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `PRODUCTION`: Enables HSTS when true (default: false)
/// - `STORAGE_BACKEND`: `postgres` (default) or `memory`
/// - `DATABASE_URL`: PostgreSQL connection string (required for `postgres`)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `PASSWORD_MEMORY_KIB`, `PASSWORD_ITERATIONS`, `PASSWORD_PARALLELISM`:
///   Argon2id cost (defaults: 65536, 3, 4)
/// - `TASK_DELETE_SCOPE`: `owner` (default) or `any`
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use todolist_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use std::env;
use std::str::FromStr;
use todolist_shared::auth::password::PasswordParams;
use todolist_shared::service::TaskDeleteScope;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Storage configuration
    pub database: DatabaseConfig,

    /// Argon2id cost parameters
    pub password: PasswordParams,

    /// Task behaviour
    pub tasks: TaskConfig,
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (enables HSTS)
    pub production: bool,
}

/// Which store backend serves requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// PostgreSQL via sqlx
    Postgres,

    /// Process-local, lost on restart
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => anyhow::bail!("STORAGE_BACKEND must be postgres or memory, got '{}'", other),
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Selected backend
    pub backend: StorageBackend,

    /// PostgreSQL connection URL (only for the postgres backend)
    pub url: Option<String>,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// Task behaviour configuration
#[derive(Debug, Clone)]
pub struct TaskConfig {
    /// Who may delete a task by ID
    pub delete_scope: TaskDeleteScope,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` is missing while the postgres backend is selected
    /// - Environment variables have invalid values
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_host = lookup("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let api_port = parse_or(&lookup, "API_PORT", 8080u16)?;

        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let production = parse_or(&lookup, "PRODUCTION", false)?;

        let backend = parse_or(&lookup, "STORAGE_BACKEND", StorageBackend::Postgres)?;
        let database_url = lookup("DATABASE_URL");
        if backend == StorageBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL environment variable is required");
        }

        let max_connections = parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 10u32)?;

        let defaults = PasswordParams::default();
        let password = PasswordParams {
            memory_kib: parse_or(&lookup, "PASSWORD_MEMORY_KIB", defaults.memory_kib)?,
            iterations: parse_or(&lookup, "PASSWORD_ITERATIONS", defaults.iterations)?,
            parallelism: parse_or(&lookup, "PASSWORD_PARALLELISM", defaults.parallelism)?,
        };

        let delete_scope = match lookup("TASK_DELETE_SCOPE") {
            Some(value) => value.parse::<TaskDeleteScope>().map_err(anyhow::Error::msg)?,
            None => TaskDeleteScope::default(),
        };

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                backend,
                url: database_url,
                max_connections,
            },
            password,
            tasks: TaskConfig { delete_scope },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("invalid value for {}: {}", key, e)),
        None => Ok(default),
    }
}
