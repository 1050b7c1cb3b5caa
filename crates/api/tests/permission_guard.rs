//! Integration tests for the permission guard.
//!
//! A small router with purpose-built handlers is used so each rule of the
//! guard (placeholder filling, wildcard grants, the non-JSON rewrite) is
//! tested on its own. Nothing here touches the database.

mod common;

use std::sync::Arc;

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use common::{body_json, get as get_anon, get_auth, token_with};
use kublade_api::middleware::auth::authenticate;
use kublade_api::middleware::permission::guarded;
use kublade_core::queue::memory::MemoryJobQueue;
use serde_json::{json, Value};

async fn json_ok() -> Json<Value> {
    Json(json!({ "status": "ok", "message": "fine" }))
}

async fn text_ok() -> &'static str {
    "plain text"
}

async fn problem_json() -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "application/problem+json")],
        r#"{"title":"teapot"}"#,
    )
}

fn guarded_app() -> Router {
    let state = common::test_state(Arc::new(MemoryJobQueue::new()));
    Router::new()
        .route(
            "/things/{thing_id}",
            guarded(get(json_ok), "ui.things.{thing_id}.view"),
        )
        .route("/scoped", guarded(get(json_ok), "ui.scoped.{scope}.view"))
        .route(
            "/either",
            guarded(get(json_ok), "ui.first.view|ui.second.view"),
        )
        .route("/text", guarded(get(text_ok), "ui.text.view"))
        .route("/problem", guarded(get(problem_json), "ui.text.view"))
        .route_layer(from_fn_with_state(state.clone(), authenticate))
        .with_state(state)
}

async fn assert_unauthorized(response: axum::response::Response) {
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "Unauthorized");
    assert!(json.get("data").is_none());
}

// ---------------------------------------------------------------------------
// Authentication in front of the guard
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_token_is_rejected_with_envelope() {
    let response = get_anon(guarded_app(), "/things/42").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn garbage_token_is_rejected() {
    let response = get_auth(guarded_app(), "/things/42", "not-a-jwt").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid or expired token");
}

// ---------------------------------------------------------------------------
// Placeholder filling and grants
// ---------------------------------------------------------------------------

#[tokio::test]
async fn exact_grant_passes_and_response_is_untouched() {
    let token = token_with(&["ui.things.42.view"]);
    let response = get_auth(guarded_app(), "/things/42", &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json, json!({ "status": "ok", "message": "fine" }));
}

#[tokio::test]
async fn grant_for_another_id_is_refused() {
    let token = token_with(&["ui.things.41.view"]);
    let response = get_auth(guarded_app(), "/things/42", &token).await;

    assert_unauthorized(response).await;
}

#[tokio::test]
async fn wildcard_grants_pass() {
    for grant in ["ui.things.42.*", "ui.things.*", "ui.*", "*"] {
        let token = token_with(&[grant]);
        let response = get_auth(guarded_app(), "/things/42", &token).await;
        assert_eq!(response.status(), StatusCode::OK, "grant {grant} should pass");
    }
}

#[tokio::test]
async fn unrelated_grants_are_refused() {
    let token = token_with(&["ui.other.*", "ui.things.42.update"]);
    let response = get_auth(guarded_app(), "/things/42", &token).await;

    assert_unauthorized(response).await;
}

#[tokio::test]
async fn dotted_or_wildcard_values_never_authorise() {
    let token = token_with(&["*"]);
    for uri in ["/things/a.b", "/things/*"] {
        let response = get_auth(guarded_app(), uri, &token).await;
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{uri} should be refused even for a superuser"
        );
    }
}

#[tokio::test]
async fn placeholder_is_filled_from_query_string() {
    let token = token_with(&["ui.scoped.alpha.view"]);

    let allowed = get_auth(guarded_app(), "/scoped?scope=alpha", &token).await;
    assert_eq!(allowed.status(), StatusCode::OK);

    let other = get_auth(guarded_app(), "/scoped?scope=beta", &token).await;
    assert_unauthorized(other).await;
}

#[tokio::test]
async fn missing_placeholder_value_is_refused() {
    let token = token_with(&["*"]);
    let response = get_auth(guarded_app(), "/scoped", &token).await;

    assert_unauthorized(response).await;
}

#[tokio::test]
async fn any_alternative_suffices() {
    let token = token_with(&["ui.second.view"]);
    let response = get_auth(guarded_app(), "/either", &token).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn empty_permission_set_is_refused() {
    let token = token_with(&[]);
    let response = get_auth(guarded_app(), "/either", &token).await;

    assert_unauthorized(response).await;
}

// ---------------------------------------------------------------------------
// Response content type
// ---------------------------------------------------------------------------

#[tokio::test]
async fn non_json_response_becomes_server_error() {
    let token = token_with(&["ui.text.view"]);
    let response = get_auth(guarded_app(), "/text", &token).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "Server Error");
}

#[tokio::test]
async fn json_suffix_media_type_passes() {
    let token = token_with(&["ui.text.view"]);
    let response = get_auth(guarded_app(), "/problem", &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["title"], "teapot");
}
