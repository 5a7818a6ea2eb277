/// Authentication and authorization utilities
///
/// This module provides the authentication primitives for Colabora:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and strength rules
/// - [`jwt`]: JWT token generation and validation
/// - [`middleware`]: Bearer token extraction and the per-request [`middleware::AuthContext`]
/// - [`authorization`]: Role checks and project access rules
///
/// # Example
///
/// ```no_run
/// use colabora_shared::auth::password::{hash_password, verify_password};
/// use colabora_shared::auth::jwt::{create_token, validate_token, Claims};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("Password1")?;
/// assert!(verify_password("Password1", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), Duration::hours(2));
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!!")?;
/// let validated = validate_token(&token, "secret-key-at-least-32-bytes-long!!")?;
/// assert_eq!(validated.sub, claims.sub);
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
