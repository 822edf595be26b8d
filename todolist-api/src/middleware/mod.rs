/// Middleware modules for the API server
///
/// This module contains custom middleware for:
/// - HTTP Basic authentication
/// - Security headers

pub mod auth;
pub mod security;
