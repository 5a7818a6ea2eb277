/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /api/auth/registro` - Register a new user and get a token
/// - `POST /api/auth/login` - Login and get a token
///
/// Both answer with the same body:
///
/// ```json
/// {
///   "id": "uuid",
///   "name": "Ana",
///   "email": "ana@example.com",
///   "role": "member",
///   "token": "eyJ..."
/// }
/// ```

use crate::{
    app::AppState,
    error::{validation_details, ApiError, ApiResult, ValidationErrorDetail},
    extract::{not_blank, AppJson, ValidatedJson},
};
use axum::{extract::State, http::StatusCode, Json};
use colabora_shared::{
    auth::{jwt, password},
    models::user::{normalize_email, CreateUser, User, UserRole},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Display name
    #[serde(default)]
    #[validate(
        custom(function = "not_blank", message = "Name is required"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: String,

    /// Email address
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password (checked for strength separately)
    #[serde(default)]
    pub password: String,

    /// Requested role, `member` (default) or `guest`
    pub role: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Response for both registration and login
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: UserRole,

    /// Bearer token for subsequent requests
    pub token: String,
}

const INVALID_CREDENTIALS: &str = "Invalid email or password";

fn issue_token(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let claims = jwt::Claims::new(user.id, state.config.jwt.ttl());
    let token = jwt::create_token(&claims, state.jwt_secret())?;

    Ok(AuthResponse {
        id: user.id,
        name: user.name,
        email: user.email,
        role: user.role,
        token,
    })
}

/// Collects field errors from `validator` rules and the password policy
fn registration_errors(req: &RegisterRequest) -> Vec<ValidationErrorDetail> {
    let mut errors = req
        .validate()
        .err()
        .map(|e| validation_details(&e))
        .unwrap_or_default();

    if let Err(message) = password::validate_password_strength(&req.password) {
        errors.push(ValidationErrorDetail::new("password", message));
    }

    errors
}

/// Register a new user
///
/// # Endpoint
///
/// ```text
/// POST /api/auth/registro
/// Content-Type: application/json
///
/// {
///   "name": "Ana",
///   "email": "ana@example.com",
///   "password": "Secreto123",
///   "role": "guest"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed, or email already registered
/// - `403 Forbidden`: `admin` role requested
/// - `500 Internal Server Error`: Server error
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let errors = registration_errors(&req);
    if !errors.is_empty() {
        return Err(ApiError::ValidationError(errors));
    }

    let role = match req.role.as_deref().map(str::trim) {
        None | Some("") => UserRole::default(),
        Some(raw) => raw
            .parse::<UserRole>()
            .map_err(|e| ApiError::field("role", e))?,
    };
    if role == UserRole::Admin {
        return Err(ApiError::Forbidden(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }

    let email = normalize_email(&req.email);
    if User::email_exists(&state.db, &email).await? {
        return Err(ApiError::field("email", "Email is already registered"));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            name: req.name.trim().to_string(),
            email,
            password_hash,
            role,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, role = %user.role, "User registered");

    Ok((StatusCode::CREATED, Json(issue_token(&state, user)?)))
}

/// Login endpoint
///
/// Unknown emails and wrong passwords get the same `401` so the response
/// does not reveal which accounts exist.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = User::find_by_email(&state.db, &normalize_email(&req.email))
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    if !password::verify_password(&req.password, &user.password_hash)? {
        tracing::debug!(user_id = %user.id, "Login rejected: wrong password");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    tracing::info!(user_id = %user.id, "User logged in");

    Ok(Json(issue_token(&state, user)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            name: name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: None,
        }
    }

    #[test]
    fn test_valid_registration_has_no_errors() {
        assert!(registration_errors(&request("Ana", "ana@example.com", "Secreto123")).is_empty());
    }

    #[test]
    fn test_registration_collects_all_errors() {
        let errors = registration_errors(&request("  ", "not-an-email", "short"));
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();

        assert!(fields.contains(&"name"));
        assert!(fields.contains(&"email"));
        assert!(fields.contains(&"password"));
    }

    #[test]
    fn test_missing_fields_reach_validation() {
        let req: RegisterRequest = serde_json::from_str(r#"{"email":"ana@example.com"}"#).unwrap();
        let fields: Vec<String> = registration_errors(&req).into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["name".to_string(), "password".to_string()]);

        let req: LoginRequest = serde_json::from_str("{}").unwrap();
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("email"));
        assert!(errors.field_errors().contains_key("password"));
    }

    #[test]
    fn test_login_requires_password() {
        let req = LoginRequest {
            email: "ana@example.com".to_string(),
            password: String::new(),
        };
        assert!(req.validate().is_err());
    }
}
