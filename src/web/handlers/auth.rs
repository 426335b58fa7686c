//! Identity session handlers: signup, login, logout, session inspection.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::web::state::SharedState;
use crate::web::utils::{api_error, outcome_response};

#[derive(Deserialize)]
pub struct CredentialsPayload {
    username: String,
    password: String,
}

pub async fn signup_handler(
    State(state): State<SharedState>,
    axum::Json(req): axum::Json<CredentialsPayload>,
) -> Response {
    let mut st = state.lock().await;
    let store = st.store.clone();
    let outcome = st.session.signup(&*store, &req.username, &req.password).await;
    if outcome.success {
        st.establish_graph().await;
    }
    outcome_response(outcome)
}

pub async fn login_handler(
    State(state): State<SharedState>,
    axum::Json(req): axum::Json<CredentialsPayload>,
) -> Response {
    let mut st = state.lock().await;
    let store = st.store.clone();
    if !st.session.login(&*store, &req.username, &req.password).await {
        return api_error(StatusCode::UNAUTHORIZED, "Invalid credentials");
    }
    st.establish_graph().await;

    let body = serde_json::json!({ "success": true, "username": req.username });
    (StatusCode::OK, axum::Json(body)).into_response()
}

pub async fn logout_handler(State(state): State<SharedState>) -> Response {
    let mut st = state.lock().await;
    let store = st.store.clone();
    st.session.logout(&*store).await;
    if !st.session.is_signed_in() {
        st.graph = None;
    }

    let body = serde_json::json!({ "signed_in": st.session.is_signed_in() });
    (StatusCode::OK, axum::Json(body)).into_response()
}

pub async fn session_handler(State(state): State<SharedState>) -> Response {
    let st = state.lock().await;
    let body = match st.session.current() {
        Some(user) => serde_json::json!({ "user": { "username": user.username } }),
        None => serde_json::json!({ "user": null }),
    };
    (StatusCode::OK, axum::Json(body)).into_response()
}
