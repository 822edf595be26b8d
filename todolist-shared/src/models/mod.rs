/// Database models for the to-do list service
///
/// # Models
///
/// - `user`: User accounts (login + password hash)
/// - `task`: Tasks owned by a single user
///
/// Query helpers accept any [`sqlx::PgExecutor`], so they can run against the
/// pool directly or inside a transaction.

pub mod task;
pub mod user;
