//! # List of Tasks Shared Library
//!
//! This crate contains the domain types, storage backends and business logic
//! used by the List of Tasks API server.
//!
//! ## Module Organization
//!
//! - `models`: User and task records with their PostgreSQL queries
//! - `auth`: Password hashing
//! - `db`: Connection pool and migrations
//! - `store`: Credential and task store contracts plus backends
//! - `validation`: Request payload validation
//! - `service`: Task/user lifecycle operations

pub mod auth;
pub mod db;
pub mod models;
pub mod service;
pub mod store;
pub mod validation;

/// Current version of the shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
