/// Password hashing using Argon2id
///
/// Passwords are hashed once at registration and verified at login. The
/// stored value is a PHC string, so the parameters travel with each hash and
/// can be raised later without invalidating existing accounts.
///
/// # Parameters
///
/// - **Algorithm**: Argon2id, version 0x13
/// - **Memory**: 19 MiB (19456 KiB)
/// - **Iterations**: 2
/// - **Parallelism**: 1
///
/// # Example
///
/// ```
/// use colabora_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Password1")?;
/// assert!(verify_password("Password1", &hash)?);
/// assert!(!verify_password("password1", &hash)?);
/// # Ok(())
/// # }
/// ```

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Minimum accepted password length
pub const MIN_PASSWORD_LENGTH: usize = 8;

const MEMORY_COST_KIB: u32 = 19_456;
const TIME_COST: u32 = 2;
const PARALLELISM: u32 = 1;

/// Error type for password hashing operations
#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    /// Failed to hash password
    #[error("Failed to hash password: {0}")]
    HashError(String),

    /// Failed to verify password
    #[error("Failed to verify password: {0}")]
    VerifyError(String),

    /// Stored hash is not a valid PHC string
    #[error("Invalid password hash format: {0}")]
    InvalidHash(String),
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(MEMORY_COST_KIB, TIME_COST, PARALLELISM, None)
        .map_err(|e| PasswordError::HashError(format!("Invalid parameters: {}", e)))?;

    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hashes a password with a fresh random salt
///
/// # Errors
///
/// Returns `PasswordError::HashError` if hashing fails
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verifies a password against a stored hash
///
/// Returns `Ok(false)` for a wrong password and an error only when the stored
/// hash itself is unusable.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|e| PasswordError::InvalidHash(e.to_string()))?;

    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerifyError(e.to_string())),
    }
}

/// Validates password strength
///
/// A password must be at least 8 characters long and contain at least one
/// upper-case letter and one digit.
///
/// # Example
///
/// ```
/// use colabora_shared::auth::password::validate_password_strength;
///
/// assert!(validate_password_strength("Password1").is_ok());
/// assert!(validate_password_strength("password1").is_err());
/// assert!(validate_password_strength("Pass1").is_err());
/// ```
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "Password must be at least {} characters long",
            MIN_PASSWORD_LENGTH
        ));
    }

    if !password.chars().any(char::is_uppercase) {
        return Err("Password must contain at least one uppercase letter".to_string());
    }

    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err("Password must contain at least one digit".to_string());
    }

    Ok(())
}
