/// Health check endpoint
///
/// Reports whether the server is up and can reach PostgreSQL. The endpoint
/// is public and always answers `200`; a failed database check only turns
/// the status to `degraded`.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0",
///   "database": "connected"
/// }
/// ```

use crate::{app::AppState, error::ApiResult};
use axum::{extract::State, Json};
use colabora_shared::db::pool;
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Application version
    pub version: String,

    /// Database status
    pub database: String,
}

/// Health check handler
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let (status, database) = match pool::health_check(&state.db).await {
        Ok(()) => ("healthy", "connected"),
        Err(e) => {
            tracing::warn!(error = %e, "Database health check failed");
            ("degraded", "disconnected")
        }
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: crate::VERSION.to_string(),
        database: database.to_string(),
    }))
}
