/// Password hashing module using Argon2id
///
/// The credential stores hash plaintext passwords on signup and verify them on
/// every authenticated request through a [`PasswordHasher`].
///
/// # Security
///
/// - **Algorithm**: Argon2id, version 0x13
/// - **Memory**: 64 MB by default
/// - **Iterations**: 3 passes by default
/// - **Parallelism**: 4 lanes by default
/// - **Output**: 32-byte hash
///
/// # Example
///
/// ```
/// use todolist_shared::auth::password::{PasswordHasher, PasswordParams};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hasher = PasswordHasher::new(PasswordParams::default())?;
/// let hash = hasher.hash("super_secret_password_123")?;
///
/// assert!(hasher.verify("super_secret_password_123", &hash)?);
/// assert!(!hasher.verify("wrong_password", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{
        rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier as _, SaltString,
    },
    Algorithm, Argon2, ParamsBuilder, Version,
};

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Invalid password hash format
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

/// Argon2id cost parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordParams {
    /// Memory cost in KiB
    pub memory_kib: u32,

    /// Number of passes
    pub iterations: u32,

    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for PasswordParams {
    fn default() -> Self {
        Self {
            memory_kib: 65536, // 64 MB
            iterations: 3,
            parallelism: 4,
        }
    }
}

/// Hashes and verifies passwords with a fixed set of Argon2id parameters
#[derive(Clone)]
pub struct PasswordHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for PasswordHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordHasher")
            .field("params", self.argon2.params())
            .finish()
    }
}

impl PasswordHasher {
    /// Creates a hasher for the given parameters
    ///
    /// # Errors
    ///
    /// Returns `PasswordError::HashError` if Argon2 rejects the parameters
    /// (for example a memory cost below `8 * parallelism` KiB).
    pub fn new(params: PasswordParams) -> Result<Self, PasswordError> {
        let params = ParamsBuilder::new()
            .m_cost(params.memory_kib)
            .t_cost(params.iterations)
            .p_cost(params.parallelism)
            .output_len(32)
            .build()
            .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hashes a password with a fresh random salt
    ///
    /// Returns a PHC string embedding algorithm, parameters and salt:
    /// ```text
    /// $argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHRzYWx0$hash...
    /// ```
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| PasswordError::HashError(format!("Hash generation failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    /// Verifies a password against a stored hash
    ///
    /// The parameters embedded in `hash` are used, so hashes created with
    /// other parameters still verify. Comparison is constant-time.
    ///
    /// Returns `Ok(false)` on a mismatch and an error only when `hash` cannot
    /// be parsed or verification itself fails.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| PasswordError::InvalidHash(format!("Failed to parse hash: {}", e)))?;

        match self.argon2.verify_password(password.as_bytes(), &parsed_hash) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(PasswordError::VerifyError(format!("Verification failed: {}", e))),
        }
    }
}
