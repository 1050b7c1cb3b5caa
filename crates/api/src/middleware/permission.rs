//! Permission guard.
//!
//! Each guarded route declares a permission template. Before the handler
//! runs, the guard fills the template's placeholders from the matched route
//! parameters (then the query string), expands it, and lets the request
//! through only if the principal holds at least one expanded name. Anything
//! else is answered with `401 {status: "error", message: "Unauthorized"}`.
//!
//! After the handler runs, a JSON response passes through unchanged. A
//! non-JSON response is replaced with `500 "Server Error"`, and the original
//! status and content type are logged at `warn`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::rejection::{QueryRejection, RawPathParamsRejection};
use axum::extract::{Query, RawPathParams, Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Response as HttpResponse, StatusCode};
use axum::middleware::{from_fn_with_state, Next};
use axum::response::Response;
use axum::routing::MethodRouter;
use kublade_core::permission::PermissionTemplate;

use crate::error::SERVER_ERROR;
use crate::middleware::auth::AuthUser;
use crate::response::ApiResponse;

const UNAUTHORIZED: &str = "Unauthorized";

/// The template a route is guarded by. Cheap to clone.
#[derive(Debug, Clone)]
pub struct RequiredPermission(Arc<PermissionTemplate>);

impl RequiredPermission {
    /// # Panics
    ///
    /// Panics if `template` does not parse; routes are built at startup.
    pub fn new(template: &'static str) -> Self {
        Self(Arc::new(PermissionTemplate::from_static(template)))
    }

    pub fn template(&self) -> &PermissionTemplate {
        &self.0
    }
}

/// Wrap `route` so every method on it requires `permission`.
///
/// ```ignore
/// guarded(get(projects::get_by_id), PERM_PROJECT_VIEW)
///     .merge(guarded(put(projects::update), PERM_PROJECT_UPDATE))
/// ```
pub fn guarded<S>(route: MethodRouter<S>, permission: &'static str) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    route.route_layer(from_fn_with_state(
        RequiredPermission::new(permission),
        permission_guard,
    ))
}

/// Middleware body of [`guarded`].
pub async fn permission_guard(
    State(required): State<RequiredPermission>,
    path_params: Result<RawPathParams, RawPathParamsRejection>,
    query: Result<Query<HashMap<String, String>>, QueryRejection>,
    request: Request,
    next: Next,
) -> Response {
    let path: Vec<(&str, &str)> = path_params
        .as_ref()
        .map(|params| params.iter().collect())
        .unwrap_or_default();
    let query = query.map(|Query(q)| q).unwrap_or_default();

    let lookup = |name: &str| {
        path.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
            .or_else(|| query.get(name).map(String::as_str))
    };

    let allowed = {
        let Some(user) = request.extensions().get::<AuthUser>() else {
            tracing::debug!(permission = %required.template(), "No authenticated principal");
            return ApiResponse::error(StatusCode::UNAUTHORIZED, UNAUTHORIZED);
        };

        match required.template().expand(lookup) {
            Ok(expanded) => {
                let allowed = user.permissions.allows_any(&expanded);
                if !allowed {
                    tracing::info!(
                        user_id = %user.user_id,
                        permission = %required.template(),
                        "Permission denied"
                    );
                }
                allowed
            }
            Err(e) => {
                tracing::warn!(
                    permission = %required.template(),
                    error = %e,
                    "Permission template could not be filled from the request"
                );
                false
            }
        }
    };

    if !allowed {
        return ApiResponse::error(StatusCode::UNAUTHORIZED, UNAUTHORIZED);
    }

    let response = next.run(request).await;
    if is_json(&response) {
        return response;
    }

    tracing::warn!(
        permission = %required.template(),
        status = %response.status(),
        content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("<none>"),
        "Non-JSON response from guarded route replaced with server error"
    );
    ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, SERVER_ERROR)
}

/// `application/json` or any `+json` media type.
fn is_json<B>(response: &HttpResponse<B>) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|media| {
            let media = media.trim().to_ascii_lowercase();
            media == "application/json" || media.ends_with("+json")
        })
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;

    use super::*;

    fn response_with(content_type: Option<&str>) -> HttpResponse<Body> {
        let mut builder = HttpResponse::builder();
        if let Some(ct) = content_type {
            builder = builder.header(CONTENT_TYPE, ct);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn json_detection() {
        assert!(is_json(&response_with(Some("application/json"))));
        assert!(is_json(&response_with(Some("application/json; charset=utf-8"))));
        assert!(is_json(&response_with(Some("application/problem+json"))));
        assert!(!is_json(&response_with(Some("text/plain"))));
        assert!(!is_json(&response_with(None)));
    }

    #[test]
    #[should_panic]
    fn invalid_template_fails_fast() {
        RequiredPermission::new("ui..projects");
    }
}
