/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and login
/// - `projects`: Projects and collaborators
/// - `tasks`: Tasks, attachments and state changes
/// - `ws`: WebSocket notifications

pub mod auth;
pub mod health;
pub mod projects;
pub mod tasks;
pub mod ws;

use crate::error::{ApiError, ValidationErrorDetail};
use axum::http::Uri;
use colabora_shared::pagination::PageParams;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Fallback for unknown routes
pub async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(format!("Route {} not found", uri.path()))
}

/// Body of endpoints that only confirm an action
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Raw `page` and `limit` query parameters
///
/// Kept as strings so malformed values fall back to the defaults instead of
/// rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    pub fn params(&self) -> PageParams {
        PageParams::from_query(self.page.as_deref(), self.limit.as_deref())
    }
}

/// Parses an optional UUID field, recording a field error when malformed
pub(crate) fn parse_uuid(
    field: &str,
    value: Option<&str>,
    errors: &mut Vec<ValidationErrorDetail>,
) -> Option<Uuid> {
    let raw = value?;
    match Uuid::parse_str(raw) {
        Ok(id) => Some(id),
        Err(_) => {
            errors.push(ValidationErrorDetail::new(
                field,
                format!("Invalid {}, expected a UUID", field),
            ));
            None
        }
    }
}
