/// Authentication utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
///
/// Passwords are only ever persisted as Argon2id PHC strings, and
/// verification relies on Argon2's constant-time comparison.

pub mod password;
