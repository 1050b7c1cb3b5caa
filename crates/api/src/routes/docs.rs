use axum::routing::get;
use axum::{Json, Router};
use serde_json::Value;

use crate::openapi;
use crate::state::AppState;

/// GET /api/v1/docs/openapi.json
async fn openapi_json() -> Json<Value> {
    Json(openapi::document())
}

/// Routes mounted at `/docs` (public).
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}
