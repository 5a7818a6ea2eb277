/// JWT token generation and validation
///
/// Tokens are signed with HS256 and carry the user ID as subject. The same
/// token authenticates REST requests and WebSocket handshakes.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Lifetime**: Configurable, see [`parse_expires_in`] (default 2 hours)
/// - **Validation**: Signature, expiration, not-before and issuer checks
///
/// # Example
///
/// ```
/// use chrono::Duration;
/// use colabora_shared::auth::jwt::{create_token, validate_token, Claims};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let secret = "your-secret-key-at-least-32-bytes-long";
///
/// let token = create_token(&Claims::new(user_id, Duration::hours(2)), secret)?;
/// let claims = validate_token(&token, secret)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer written into and required from every token
pub const ISSUER: &str = "colabora";

/// Token lifetime used when none is configured
pub const DEFAULT_EXPIRES_IN: &str = "2h";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Signature or format check failed
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Token was issued by someone else
    #[error("Invalid token issuer")]
    InvalidIssuer,

    /// Lifetime setting could not be parsed
    #[error("Invalid token lifetime '{0}', expected e.g. 3600, 45s, 30m, 2h or 7d")]
    InvalidLifetime(String),
}

/// JWT claims
///
/// - `sub`: Subject (user ID)
/// - `iss`: Issuer (always [`ISSUER`])
/// - `iat`: Issued at timestamp
/// - `nbf`: Not before timestamp
/// - `exp`: Expiration timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub iat: i64,
    pub nbf: i64,
    pub exp: i64,
}

impl Claims {
    /// Creates claims for a user that expire after `ttl`
    pub fn new(user_id: Uuid, ttl: Duration) -> Self {
        let now = Utc::now();

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            nbf: now.timestamp(),
            exp: (now + ttl).timestamp(),
        }
    }
}

/// Signs claims into a token string
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&Header::new(Algorithm::HS256), claims, &key)
        .map_err(|e| JwtError::CreateError(e.to_string()))
}

/// Validates a token and returns its claims
///
/// # Errors
///
/// - `JwtError::Expired` if `exp` is in the past
/// - `JwtError::InvalidIssuer` if the issuer is not [`ISSUER`]
/// - `JwtError::ValidationError` for a bad signature or malformed token
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer,
        _ => JwtError::ValidationError(e.to_string()),
    })?;

    Ok(data.claims)
}

/// Parses a token lifetime such as `"2h"`, `"30m"`, `"7d"`, `"45s"` or `"3600"`
///
/// A bare number is read as seconds. Zero and negative lifetimes are rejected.
pub fn parse_expires_in(raw: &str) -> Result<Duration, JwtError> {
    let value = raw.trim();
    let invalid = || JwtError::InvalidLifetime(raw.to_string());

    let (digits, unit) = match value.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&value[..idx], Some(c.to_ascii_lowercase())),
        Some(_) => (value, None),
        None => return Err(invalid()),
    };

    let amount: i64 = digits.trim().parse().map_err(|_| invalid())?;
    if amount <= 0 {
        return Err(invalid());
    }

    match unit {
        None | Some('s') => Ok(Duration::seconds(amount)),
        Some('m') => Ok(Duration::minutes(amount)),
        Some('h') => Ok(Duration::hours(amount)),
        Some('d') => Ok(Duration::days(amount)),
        Some(_) => Err(invalid()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_claims_creation() {
        let user_id = Uuid::new_v4();
        let claims = Claims::new(user_id, Duration::hours(2));

        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.exp - claims.iat, 7200);
        assert!(claims.exp > Utc::now().timestamp());
    }

    #[test]
    fn test_create_and_validate_token() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id, Duration::hours(1)), SECRET).unwrap();

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated.sub, user_id);
        assert_eq!(validated.iss, ISSUER);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_token(&Claims::new(Uuid::new_v4(), Duration::hours(1)), SECRET).unwrap();

        let result = validate_token(&token, "another-secret-key-at-least-32-bytes");
        assert!(matches!(result, Err(JwtError::ValidationError(_))));
    }

    #[test]
    fn test_validate_expired_token() {
        let claims = Claims::new(Uuid::new_v4(), Duration::seconds(-3600));
        assert!(claims.exp < Utc::now().timestamp());

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_validate_foreign_issuer() {
        let mut claims = Claims::new(Uuid::new_v4(), Duration::hours(1));
        claims.iss = "someone-else".to_string();

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::InvalidIssuer)));
    }

    #[test]
    fn test_validate_garbage() {
        assert!(validate_token("not.a.token", SECRET).is_err());
        assert!(validate_token("", SECRET).is_err());
    }

    #[test]
    fn test_parse_expires_in() {
        assert_eq!(parse_expires_in("2h").unwrap(), Duration::hours(2));
        assert_eq!(parse_expires_in("30m").unwrap(), Duration::minutes(30));
        assert_eq!(parse_expires_in("7d").unwrap(), Duration::days(7));
        assert_eq!(parse_expires_in("45s").unwrap(), Duration::seconds(45));
        assert_eq!(parse_expires_in("3600").unwrap(), Duration::seconds(3600));
        assert_eq!(parse_expires_in(" 1H ").unwrap(), Duration::hours(1));
        assert_eq!(parse_expires_in(DEFAULT_EXPIRES_IN).unwrap(), Duration::hours(2));
    }

    #[test]
    fn test_parse_expires_in_rejects_invalid() {
        for raw in ["", "h", "0", "-5m", "2w", "two hours", "1.5h"] {
            assert!(parse_expires_in(raw).is_err(), "'{}' should be rejected", raw);
        }
    }
}
