//! Uniform response envelope.
//!
//! Every body the API emits, success or error, has the shape
//!
//! ```text
//! { "status": "ok" | "error", "message": string, "data"?: any, "error"?: Failure }
//! ```
//!
//! with at most one of `data` and `error` present. Build responses through
//! [`ApiResponse::generate`] or the [`Envelope`] responder rather than ad-hoc
//! `json!` bodies.

use std::backtrace::Backtrace;
use std::panic::Location;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// The `status` field of the envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    Ok,
    Error,
}

/// A caught failure, serialised under `error`.
///
/// Carries the capture site and a backtrace, so only emit it behind
/// authentication.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    /// The error's display text joined with its source chain.
    pub message: String,
    /// Application error code; `0` when none applies.
    pub code: i64,
    pub file: String,
    pub line: u32,
    /// Backtrace at the capture site, one frame line per entry.
    pub trace: Vec<String>,
}

impl Failure {
    /// Capture `err` at the caller's location.
    #[track_caller]
    pub fn capture<E: std::error::Error + ?Sized>(err: &E) -> Self {
        let location = Location::caller();

        let mut message = err.to_string();
        let mut source = err.source();
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }

        let trace = Backtrace::force_capture()
            .to_string()
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect();

        Self {
            message,
            code: 0,
            file: location.file().to_string(),
            line: location.line(),
            trace,
        }
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }
}

/// Optional payload of an envelope.
#[derive(Debug, Clone)]
pub enum Payload {
    /// Neither `data` nor `error` is emitted.
    None,
    /// Emitted verbatim under `data`.
    Data(serde_json::Value),
    /// Emitted under `error`.
    Failure(Failure),
}

#[derive(Serialize)]
struct Body<'a> {
    status: StatusTag,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a Failure>,
}

/// Envelope builder.
pub struct ApiResponse;

impl ApiResponse {
    /// Build the envelope body without an HTTP status.
    pub fn body(status: StatusTag, message: &str, payload: &Payload) -> serde_json::Value {
        let (data, error) = match payload {
            Payload::None => (None, None),
            Payload::Data(value) => (Some(value), None),
            Payload::Failure(failure) => (None, Some(failure)),
        };
        serde_json::json!(Body {
            status,
            message,
            data,
            error,
        })
    }

    /// Build a JSON response with the given status code and envelope.
    pub fn generate(
        status_code: StatusCode,
        status: StatusTag,
        message: impl AsRef<str>,
        payload: Payload,
    ) -> Response {
        let body = Self::body(status, message.as_ref(), &payload);
        (status_code, Json(body)).into_response()
    }

    /// Error envelope without payload.
    pub fn error(status_code: StatusCode, message: impl AsRef<str>) -> Response {
        Self::generate(status_code, StatusTag::Error, message, Payload::None)
    }
}

/// Typed success responder: `{status: "ok", message, data}`.
///
/// ```ignore
/// Ok(Envelope::ok("Project retrieved", project))
/// ```
#[derive(Debug)]
pub struct Envelope<T: Serialize> {
    pub status_code: StatusCode,
    pub message: &'static str,
    pub data: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(message: &'static str, data: T) -> Self {
        Self {
            status_code: StatusCode::OK,
            message,
            data,
        }
    }

    pub fn created(message: &'static str, data: T) -> Self {
        Self {
            status_code: StatusCode::CREATED,
            message,
            data,
        }
    }

    pub fn with_status(mut self, status_code: StatusCode) -> Self {
        self.status_code = status_code;
        self
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        match serde_json::to_value(&self.data) {
            Ok(data) => ApiResponse::generate(
                self.status_code,
                StatusTag::Ok,
                self.message,
                Payload::Data(data),
            ),
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize response data");
                ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "Server Error")
            }
        }
    }
}
