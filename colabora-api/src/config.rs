/// Configuration management for the API server
///
/// This module loads configuration from environment variables (and a `.env`
/// file when present) into a type-safe configuration struct.
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 3000)
/// - `APP_ENV`: `production` hides internal error details (default: development)
/// - `CORS_ORIGINS`: Comma-separated allowed origins, `*` for any (default: *)
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for JWT signing, at least 32 characters (required)
/// - `JWT_EXPIRES_IN`: Token lifetime such as `2h`, `30m` or `3600` (default: 2h)
/// - `UPLOADS_DIR`: Where attached files are written (default: ./uploads)
/// - `UPLOAD_MAX_BYTES`: Maximum request body for uploads (default: 10 MiB)
/// - `UPLOAD_MAX_FILES`: Maximum files per task (default: 5)
/// - `BOOTSTRAP_ADMIN_EMAIL`, `BOOTSTRAP_ADMIN_PASSWORD`, `BOOTSTRAP_ADMIN_NAME`:
///   Optional admin account created at startup
/// - `RUST_LOG`, `LOG_FORMAT`: Logging filter and `json` output (read in `main`)
///
/// # Example
///
/// ```no_run
/// use colabora_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use colabora_shared::auth::jwt;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT configuration
    pub jwt: JwtConfig,

    /// File upload configuration
    pub uploads: UploadConfig,

    /// Admin account to create on startup, if any
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Host to bind to
    pub host: String,

    /// Port to bind to
    pub port: u16,

    /// Production mode: internal error messages are not sent to clients
    pub production: bool,

    /// Allowed CORS origins (`*` allows any)
    pub cors_origins: Vec<String>,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in pool
    pub max_connections: u32,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 characters. Generate with: `openssl rand -hex 32`
    pub secret: String,

    /// Token lifetime in seconds
    pub expires_in_seconds: i64,
}

impl JwtConfig {
    /// Token lifetime as a duration
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.expires_in_seconds)
    }
}

/// File upload configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Directory attached files are written to and served from
    pub dir: PathBuf,

    /// Maximum size of an upload request body
    pub max_request_bytes: usize,

    /// Maximum number of files attached in one request
    pub max_files: usize,
}

/// Admin account created on startup when missing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapAdmin {
    pub name: String,
    pub email: String,
    pub password: String,
}

const MIN_SECRET_LENGTH: usize = 32;

fn parse_or<T: std::str::FromStr>(value: Option<String>, default: T, key: &str) -> anyhow::Result<T>
where
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e)),
        None => Ok(default),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - A numeric or duration variable has an invalid value
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let host = get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = parse_or(get("API_PORT"), 3000u16, "API_PORT")?;
        let production = get("APP_ENV")
            .map(|env| env.trim().eq_ignore_ascii_case("production"))
            .unwrap_or(false);
        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| "*".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let database_url = get("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = parse_or(get("DATABASE_MAX_CONNECTIONS"), 10u32, "DATABASE_MAX_CONNECTIONS")?;

        let jwt_secret = get("JWT_SECRET")
            .ok_or_else(|| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < MIN_SECRET_LENGTH {
            anyhow::bail!("JWT_SECRET must be at least {} characters long", MIN_SECRET_LENGTH);
        }
        let expires_in = get("JWT_EXPIRES_IN").unwrap_or_else(|| jwt::DEFAULT_EXPIRES_IN.to_string());
        let ttl = jwt::parse_expires_in(&expires_in)?;

        let uploads = UploadConfig {
            dir: PathBuf::from(get("UPLOADS_DIR").unwrap_or_else(|| "./uploads".to_string())),
            max_request_bytes: parse_or(get("UPLOAD_MAX_BYTES"), 10 * 1024 * 1024usize, "UPLOAD_MAX_BYTES")?,
            max_files: parse_or(get("UPLOAD_MAX_FILES"), 5usize, "UPLOAD_MAX_FILES")?,
        };

        let bootstrap_admin = match (get("BOOTSTRAP_ADMIN_EMAIL"), get("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(BootstrapAdmin {
                name: get("BOOTSTRAP_ADMIN_NAME").unwrap_or_else(|| "Admin".to_string()),
                email,
                password,
            }),
            (None, None) => None,
            _ => anyhow::bail!(
                "BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together"
            ),
        };

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                production,
                cors_origins,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                expires_in_seconds: ttl.num_seconds(),
            },
            uploads,
            bootstrap_admin,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// Pool settings for the shared database layer
    pub fn pool_config(&self) -> colabora_shared::db::pool::DatabaseConfig {
        colabora_shared::db::pool::DatabaseConfig {
            url: self.database.url.clone(),
            max_connections: self.database.max_connections,
            ..Default::default()
        }
    }
}
