/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `index`: HTML landing page
/// - `tasks`: Task endpoints (Basic auth)
/// - `users`: Signup and account deletion

pub mod index;
pub mod tasks;
pub mod users;
