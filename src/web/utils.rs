//! Shared utility functions for the web layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::model::OpOutcome;

/// Build a standard JSON error response.
pub fn api_error(status: StatusCode, message: impl Into<String>) -> Response {
    let body = serde_json::json!({ "error": message.into() });
    (status, axum::Json(body)).into_response()
}

/// The standard "sign in first" response for session-guarded routes.
pub fn not_signed_in() -> Response {
    api_error(StatusCode::UNAUTHORIZED, "not signed in")
}

/// Render a mutator outcome.  Both success and structured refusal come back
/// as 200 with the `{success, message}` body — the caller reads the flag,
/// exactly as the UI consumed these results in event handlers.
pub fn outcome_response(outcome: OpOutcome) -> Response {
    (StatusCode::OK, axum::Json(outcome)).into_response()
}
