//! Integration tests for the router as a whole: health, docs, request IDs,
//! and the envelope on request rejections.
//!
//! The pool never connects, so these only cover behaviour in front of the
//! database.

mod common;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{Method, Request, StatusCode};
use common::{body_json, build_test_app, get, get_auth, post_json, send, send_json, token_with};
use serde_json::json;

// ---------------------------------------------------------------------------
// Health, docs and routing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_reports_unreachable_database() {
    let response = get(build_test_app(), "/health").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["db_healthy"], false);
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let response = get(build_test_app(), "/api/v1/docs/openapi.json").await;

    let request_id = response
        .headers()
        .get("x-request-id")
        .expect("x-request-id header")
        .to_str()
        .unwrap();
    assert_eq!(request_id.len(), 36);
}

#[tokio::test]
async fn incoming_request_id_is_propagated() {
    let request = Request::get("/api/v1/docs/openapi.json")
        .header("x-request-id", "trace-me-123")
        .body(Body::empty())
        .unwrap();
    let response = send(build_test_app(), request).await;

    assert_eq!(response.headers()["x-request-id"], "trace-me-123");
}

#[tokio::test]
async fn openapi_document_is_public() {
    let response = get(build_test_app(), "/api/v1/docs/openapi.json").await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["openapi"], "3.0.3");
    assert!(json["paths"]["/projects/{project_id}/chat"]["post"].is_object());
    assert!(json["components"]["schemas"]["Envelope"].is_object());
}

#[tokio::test]
async fn cors_preflight_allows_configured_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/projects")
        .header("origin", "http://localhost:5173")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = send(build_test_app(), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://localhost:5173"
    );
}

#[tokio::test]
async fn cors_ignores_unknown_origin() {
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/projects")
        .header("origin", "http://evil.test")
        .header("access-control-request-method", "POST")
        .body(Body::empty())
        .unwrap();
    let response = send(build_test_app(), request).await;

    assert!(response.headers().get("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let response = get(build_test_app(), "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Authentication
// ---------------------------------------------------------------------------

#[tokio::test]
async fn protected_route_without_token_returns_401_envelope() {
    let response = get(build_test_app(), "/api/v1/auth/me").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "Missing Authorization header");
}

#[tokio::test]
async fn malformed_authorization_header_returns_401() {
    let request = Request::get("/api/v1/projects")
        .header(AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();
    let response = send(build_test_app(), request).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn token_signed_with_another_secret_is_rejected() {
    let mut config = common::test_config().jwt;
    config.secret = "a-completely-different-secret-value".to_string();
    let token = config
        .sign(kublade_core::types::new_id(), "mallory@example.com", vec!["*".to_string()])
        .unwrap();

    let response = get_auth(build_test_app(), "/api/v1/users", &token).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid or expired token");
}

#[tokio::test]
async fn resource_route_without_permission_returns_401() {
    let token = token_with(&["ui.projects.view"]);
    let response = get_auth(build_test_app(), "/api/v1/users", &token).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Unauthorized");
}

#[tokio::test]
async fn logout_requires_a_refresh_token() {
    let token = token_with(&[]);
    let response = post_json(
        build_test_app(),
        "/api/v1/auth/logout",
        Some(&token),
        json!({ "refresh_token": "" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Refresh token must not be empty");
}

#[tokio::test]
async fn logout_looks_up_the_presented_session() {
    let token = token_with(&[]);
    let response = post_json(
        build_test_app(),
        "/api/v1/auth/logout",
        Some(&token),
        json!({ "refresh_token": "0123456789abcdef" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["message"], "Server Error");
}

// ---------------------------------------------------------------------------
// Per-project grants
// ---------------------------------------------------------------------------

#[tokio::test]
async fn project_grant_reaches_the_handler() {
    let project_id = kublade_core::types::new_id();
    let token = token_with(&[&format!("ui.projects.{project_id}.view")]);
    let response = get_auth(
        build_test_app(),
        &format!("/api/v1/projects/{project_id}"),
        &token,
    )
    .await;

    // Past the guard, the handler hits the unreachable database.
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["message"], "Server Error");
}

#[tokio::test]
async fn project_grant_does_not_cover_other_projects() {
    let granted = kublade_core::types::new_id();
    let token = token_with(&[&format!("ui.projects.{granted}.view")]);
    let other = kublade_core::types::new_id();
    let response = get_auth(build_test_app(), &format!("/api/v1/projects/{other}"), &token).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Unauthorized");
}

#[tokio::test]
async fn query_string_cannot_override_the_path_project() {
    let granted = kublade_core::types::new_id();
    let token = token_with(&[&format!("ui.projects.{granted}.view")]);
    let other = kublade_core::types::new_id();
    let response = get_auth(
        build_test_app(),
        &format!("/api/v1/projects/{other}?project_id={granted}"),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ---------------------------------------------------------------------------
// Request rejections stay inside the envelope
// ---------------------------------------------------------------------------

#[tokio::test]
async fn invalid_login_body_returns_400_envelope() {
    let response = post_json(
        build_test_app(),
        "/api/v1/auth/login",
        None,
        json!({ "email": "not-an-email", "password": "" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(
        json["message"],
        "Invalid email format; Password must not be empty"
    );
}

#[tokio::test]
async fn malformed_json_returns_400_envelope() {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/login")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = send(build_test_app(), request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["status"], "error");
}

#[tokio::test]
async fn bad_path_id_on_guarded_route_returns_400_not_500() {
    let token = token_with(&["ui.projects.*"]);
    let response = get_auth(build_test_app(), "/api/v1/projects/not-a-uuid", &token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["status"], "error");
}

#[tokio::test]
async fn invalid_namespace_is_rejected_before_the_database() {
    let token = token_with(&["ui.projects.create"]);
    let response = post_json(
        build_test_app(),
        "/api/v1/projects",
        Some(&token),
        json!({ "name": "Demo", "namespace": "Not_A_Label" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["message"].as_str().unwrap().contains("Namespace"));
}

#[tokio::test]
async fn chat_message_with_unknown_role_is_rejected() {
    let token = token_with(&["ui.projects.*"]);
    let project_id = kublade_core::types::new_id();
    let response = post_json(
        build_test_app(),
        &format!("/api/v1/projects/{project_id}/chat"),
        Some(&token),
        json!({ "role": "tool", "content": "hello" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["message"].as_str().unwrap().contains("Chat role"));
}

#[tokio::test]
async fn template_with_parent_git_path_is_rejected() {
    let token = token_with(&["ui.templates.create"]);
    let response = send_json(
        build_test_app(),
        Method::POST,
        "/api/v1/templates",
        Some(&token),
        json!({
            "name": "Redis",
            "git_url": "https://github.com/kublade/templates.git",
            "git_path": "charts/../../etc"
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn database_outage_surfaces_as_sanitized_500() {
    let token = token_with(&["ui.projects.view"]);
    let response = get_auth(build_test_app(), "/api/v1/projects", &token).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "Server Error");
}
