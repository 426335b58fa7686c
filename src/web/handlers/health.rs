//! Health check endpoint.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use crate::directory;
use crate::kv::{decode_list, PHOTOS_KEY};
use crate::model::Post;
use crate::web::state::SharedState;

pub async fn health_handler(State(state): State<SharedState>) -> impl IntoResponse {
    let st = state.lock().await;

    let user_count = directory::load_directory(st.store.as_ref())
        .await
        .map(|u| u.len())
        .unwrap_or(0);
    let post_count = match st.store.get(PHOTOS_KEY).await {
        Ok(raw) => decode_list::<Post>(PHOTOS_KEY, raw)
            .map(|p| p.len())
            .unwrap_or(0),
        Err(_) => 0,
    };

    let body = serde_json::json!({
        "status": "ok",
        "signed_in": st.session.is_signed_in(),
        "users": user_count,
        "posts": post_count,
    });
    (StatusCode::OK, axum::Json(body))
}
