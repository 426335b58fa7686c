//! Friend graph handlers: search, request lifecycle, friend list.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::directory;
use crate::web::state::SharedState;
use crate::web::utils::{not_signed_in, outcome_response};

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[derive(Deserialize)]
pub struct SendRequestPayload {
    username: String,
}

pub async fn search_users_handler(
    State(state): State<SharedState>,
    Query(query): Query<SearchQuery>,
) -> Response {
    let st = state.lock().await;
    let Some(viewer) = st.current_username() else {
        return not_signed_in();
    };

    let hits = directory::search_users(st.store.as_ref(), &viewer, &query.q).await;
    (StatusCode::OK, axum::Json(hits)).into_response()
}

pub async fn list_friends_handler(State(state): State<SharedState>) -> Response {
    let st = state.lock().await;
    let Some(graph) = st.graph.as_ref() else {
        return not_signed_in();
    };
    (StatusCode::OK, axum::Json(graph.friends())).into_response()
}

pub async fn remove_friend_handler(
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Response {
    let mut st = state.lock().await;
    let store = st.store.clone();
    let Some(graph) = st.graph.as_mut() else {
        return not_signed_in();
    };
    outcome_response(graph.remove_friend(&*store, &username).await)
}

pub async fn list_friend_requests_handler(State(state): State<SharedState>) -> Response {
    let st = state.lock().await;
    let Some(graph) = st.graph.as_ref() else {
        return not_signed_in();
    };
    let body = serde_json::json!({
        "incoming": graph.incoming(),
        "outgoing": graph.outgoing(),
    });
    (StatusCode::OK, axum::Json(body)).into_response()
}

pub async fn send_friend_request_handler(
    State(state): State<SharedState>,
    axum::Json(req): axum::Json<SendRequestPayload>,
) -> Response {
    let mut st = state.lock().await;
    let store = st.store.clone();
    let Some(graph) = st.graph.as_mut() else {
        return not_signed_in();
    };
    outcome_response(graph.send_friend_request(&*store, req.username.trim()).await)
}

pub async fn accept_friend_request_handler(
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Response {
    let mut st = state.lock().await;
    let store = st.store.clone();
    let Some(graph) = st.graph.as_mut() else {
        return not_signed_in();
    };
    outcome_response(graph.accept_friend_request(&*store, &username).await)
}

pub async fn reject_friend_request_handler(
    State(state): State<SharedState>,
    Path(username): Path<String>,
) -> Response {
    let mut st = state.lock().await;
    let store = st.store.clone();
    let Some(graph) = st.graph.as_mut() else {
        return not_signed_in();
    };
    outcome_response(graph.reject_friend_request(&*store, &username).await)
}
