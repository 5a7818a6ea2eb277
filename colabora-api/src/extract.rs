/// Request extractors with API-shaped rejections
///
/// axum's built-in extractors reject with plain-text bodies. These wrappers
/// turn every rejection into an [`ApiError`] so clients always get the JSON
/// error format.

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
};
use serde::de::DeserializeOwned;
use validator::{Validate, ValidationError};

use crate::error::ApiError;

/// JSON body that is deserialized and then validated
///
/// Malformed JSON is a `400 bad_request`; failed `validator` rules are a
/// `400 validation_error` with one detail per field.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let AppJson(value) = AppJson::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// JSON body, rejected as `400 bad_request` when missing or malformed
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct AppJson<T>(pub T);

/// Path parameters, rejected as `400 bad_request` (e.g. a malformed UUID)
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct AppPath<T>(pub T);

/// Query string, rejected as `400 bad_request` (e.g. a repeated key)
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct AppQuery<T>(pub T);

/// `validator` rule rejecting empty or whitespace-only strings
///
/// Pair it with a message: `#[validate(custom(function = "not_blank", message = "..."))]`.
pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::header};
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    struct Named {
        #[validate(custom(function = "not_blank", message = "Name is required"))]
        name: String,
    }

    #[derive(Debug, Deserialize)]
    struct Paged {
        page: Option<String>,
    }

    fn json_request(body: &'static str) -> Request {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_valid_body_passes() {
        let ValidatedJson(named) =
            ValidatedJson::<Named>::from_request(json_request(r#"{"name":"Ana"}"#), &())
                .await
                .unwrap();
        assert_eq!(named.name, "Ana");
    }

    #[tokio::test]
    async fn test_rule_violation_is_validation_error() {
        let err = ValidatedJson::<Named>::from_request(json_request(r#"{"name":"  "}"#), &())
            .await
            .unwrap_err();

        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 1);
                assert_eq!(details[0].field, "name");
                assert_eq!(details[0].message, "Name is required");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let err = ValidatedJson::<Named>::from_request(json_request("{"), &())
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_query_rejection_is_api_error() {
        let (mut parts, _) = Request::builder()
            .uri("/?page=1&page=2")
            .body(Body::empty())
            .unwrap()
            .into_parts();

        let err = AppQuery::<Paged>::from_request_parts(&mut parts, &()).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let (mut parts, _) = Request::builder()
            .uri("/?page=3")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let AppQuery(paged) = AppQuery::<Paged>::from_request_parts(&mut parts, &()).await.unwrap();
        assert_eq!(paged.page.as_deref(), Some("3"));
    }
}
