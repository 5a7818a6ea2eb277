/// User model and database operations
///
/// This module provides the User model and the queries used by registration,
/// login and request authentication.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('admin', 'member', 'guest');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     email VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'member',
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT users_email_key UNIQUE (email)
/// );
/// ```
///
/// Emails are normalized to lower case before they reach the database, so the
/// unique constraint is effectively case-insensitive.
///
/// # Example
///
/// ```no_run
/// use colabora_shared::models::user::{CreateUser, User, UserRole};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     name: "Ana".to_string(),
///     email: "Ana@Example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     role: UserRole::Member,
/// }).await?;
///
/// assert_eq!(user.email, "ana@example.com");
///
/// let found = User::find_by_email(&pool, "ANA@example.com").await?;
/// assert!(found.is_some());
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Global role of a user
///
/// Roles are account-wide. Project access is decided separately by
/// collaboration membership, see [`crate::auth::authorization`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Full access, may delete any project
    Admin,

    /// Regular user (default)
    #[default]
    Member,

    /// Read-only user
    Guest,
}

impl UserRole {
    /// Roles allowed to create or modify resources
    pub const WRITERS: &'static [UserRole] = &[UserRole::Admin, UserRole::Member];

    /// Converts role to its stored string form
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Member => "member",
            UserRole::Guest => "guest",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(UserRole::Admin),
            "member" => Ok(UserRole::Member),
            "guest" => Ok(UserRole::Guest),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

/// User model representing a user account
///
/// Passwords are stored as Argon2id hashes and never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID
    pub id: Uuid,

    /// Display name
    pub name: String,

    /// Email address (lower case, unique)
    pub email: String,

    /// Argon2id password hash
    #[serde(skip_serializing, default)]
    pub password_hash: String,

    /// Global role
    pub role: UserRole,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,
}

/// Minimal public view of a user, embedded in task and project payloads
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
        }
    }
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Display name
    pub name: String,

    /// Email address (normalized to lower case on insert)
    pub email: String,

    /// Argon2id password hash (NOT the plaintext password)
    pub password_hash: String,

    /// Global role
    pub role: UserRole,
}

/// Normalizes an email for storage and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns a database error if the email is already taken
    /// (`users_email_key` unique violation) or the connection fails.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, role, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .bind(normalize_email(&data.email))
        .bind(data.password_hash)
        .bind(data.role)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email (case-insensitive)
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, role, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(normalize_email(email))
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Checks whether an email is already registered
    pub async fn email_exists(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE email = $1)")
                .bind(normalize_email(email))
                .fetch_one(pool)
                .await?;

        Ok(exists)
    }

    /// Loads name summaries for a set of users
    ///
    /// Unknown IDs are silently skipped.
    pub async fn summaries(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<UserSummary>, sqlx::Error> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let users = sqlx::query_as::<_, UserSummary>(
            "SELECT id, name FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_as_str() {
        assert_eq!(UserRole::Admin.as_str(), "admin");
        assert_eq!(UserRole::Member.as_str(), "member");
        assert_eq!(UserRole::Guest.as_str(), "guest");
    }

    #[test]
    fn test_role_default_is_member() {
        assert_eq!(UserRole::default(), UserRole::Member);
    }

    #[test]
    fn test_writers_exclude_guest() {
        assert!(UserRole::WRITERS.contains(&UserRole::Admin));
        assert!(UserRole::WRITERS.contains(&UserRole::Member));
        assert!(!UserRole::WRITERS.contains(&UserRole::Guest));
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!("guest".parse::<UserRole>().unwrap(), UserRole::Guest);
        assert!("owner".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Ana@Example.COM "), "ana@example.com");
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "$argon2id$secret".to_string(),
            role: UserRole::Member,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "member");
    }
}
