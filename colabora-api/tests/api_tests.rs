//! Router-level tests that run without a database
//!
//! Every request here is answered before the first query: missing or bad
//! credentials, validation failures, unknown routes and XML negotiation.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use colabora_shared::auth::jwt::{create_token, Claims};
use common::{get, json_request, TestContext, TEST_SECRET};
use serde_json::json;
use uuid::Uuid;

#[tokio::test]
async fn test_health_reports_degraded_without_database() {
    let ctx = TestContext::offline();

    let (status, body) = ctx.send(get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["database"], "disconnected");
    assert_eq!(body["version"], colabora_api::VERSION);
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let ctx = TestContext::offline();

    for uri in ["/api/proyectos", "/api/tareas"] {
        let (status, body) = ctx.send(get(uri, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert_eq!(body["error"], "unauthorized");
    }
}

#[tokio::test]
async fn test_non_bearer_scheme_is_rejected() {
    let ctx = TestContext::offline();

    let request = Request::builder()
        .uri("/api/proyectos")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let (status, body) = ctx.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Expected Bearer token");
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let ctx = TestContext::offline();

    let (status, body) = ctx.send(get("/api/tareas", Some("not.a.jwt"))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");
}

#[tokio::test]
async fn test_token_signed_with_other_secret_is_rejected() {
    let ctx = TestContext::offline();
    let claims = Claims::new(Uuid::new_v4(), chrono::Duration::hours(1));
    let token = create_token(&claims, "a-completely-different-secret-value-32b").unwrap();

    let (status, _) = ctx.send(get("/api/proyectos", Some(&token))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let ctx = TestContext::offline();
    let claims = Claims::new(Uuid::new_v4(), chrono::Duration::hours(-2));
    let token = create_token(&claims, TEST_SECRET).unwrap();

    let (status, body) = ctx.send(get("/api/proyectos", Some(&token))).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Token expired");
}

#[tokio::test]
async fn test_register_validation_reports_fields() {
    let ctx = TestContext::offline();

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/api/auth/registro",
            None,
            json!({ "name": "", "email": "nope", "password": "weak" }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");

    let fields: Vec<&str> = body["details"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|d| d["field"].as_str())
        .collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
}

#[tokio::test]
async fn test_register_missing_name_is_a_field_error() {
    let ctx = TestContext::offline();

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/api/auth/registro",
            None,
            json!({ "email": "ana@example.com", "password": "Secreto123" }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"][0]["field"], "name");
    assert_eq!(body["details"][0]["message"], "Name is required");
}

#[tokio::test]
async fn test_login_with_empty_body_reports_fields() {
    let ctx = TestContext::offline();

    let (status, body) = ctx
        .send(json_request("POST", "/api/auth/login", None, json!({})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "email");
    assert_eq!(body["details"][1]["field"], "password");
}

#[tokio::test]
async fn test_register_cannot_request_admin() {
    let ctx = TestContext::offline();

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/api/auth/registro",
            None,
            json!({
                "name": "Mallory",
                "email": "mallory@example.com",
                "password": "Secreto123",
                "role": "admin",
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
async fn test_register_rejects_unknown_role() {
    let ctx = TestContext::offline();

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/api/auth/registro",
            None,
            json!({
                "name": "Ana",
                "email": "ana@example.com",
                "password": "Secreto123",
                "role": "owner",
            }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "role");
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let ctx = TestContext::offline();

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\":"))
        .unwrap();
    let (status, body) = ctx.send(request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}

#[tokio::test]
async fn test_login_validates_email() {
    let ctx = TestContext::offline();

    let (status, body) = ctx
        .send(json_request(
            "POST",
            "/api/auth/login",
            None,
            json!({ "email": "not-an-email", "password": "x" }),
        ))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "email");
}

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let ctx = TestContext::offline();

    let (status, body) = ctx.send(get("/api/nothing-here", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_xml_when_requested() {
    let ctx = TestContext::offline();

    let request = Request::builder()
        .uri("/api/nothing-here")
        .header(header::ACCEPT, "application/xml")
        .body(Body::empty())
        .unwrap();
    let response = {
        use tower::ServiceExt;
        ctx.app.clone().oneshot(request).await.unwrap()
    };

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("application/xml"));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let xml = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(xml.contains("<response>"));
    assert!(xml.contains("<error>not_found</error>"));
}

#[tokio::test]
async fn test_websocket_handshake_requires_token() {
    let ctx = TestContext::offline();

    let (status, body) = ctx.send(get("/ws", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = ctx.send(get("/ws?token=garbage", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_query_is_json_bad_request() {
    let ctx = TestContext::offline();

    let (status, body) = ctx.send(get("/ws?token=a&token=b", None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "bad_request");
}
