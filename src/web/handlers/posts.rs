//! Post creation and feed handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use crate::feed::{compose_explore, compose_feed};
use crate::kv::{decode_list, encode_value, KeyValueStore, StoreError, PHOTOS_KEY};
use crate::model::{Post, PostAuthor, PostImages};
use crate::web::state::SharedState;
use crate::web::utils::{api_error, not_signed_in};
use crate::{logging, mlog};

#[derive(Deserialize)]
pub struct CreatePostPayload {
    front: Option<String>,
    back: Option<String>,
}

async fn load_photos(store: &dyn KeyValueStore) -> Result<Vec<Post>, StoreError> {
    let raw = store.get(PHOTOS_KEY).await?;
    decode_list(PHOTOS_KEY, raw)
}

pub async fn create_post_handler(
    State(state): State<SharedState>,
    axum::Json(req): axum::Json<CreatePostPayload>,
) -> Response {
    let st = state.lock().await;
    let Some(username) = st.current_username() else {
        return not_signed_in();
    };

    let Some(images) = PostImages::from_parts(req.front, req.back) else {
        return api_error(StatusCode::BAD_REQUEST, "a post needs at least one image");
    };

    let post = Post {
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        author: Some(PostAuthor {
            username: username.clone(),
        }),
        images,
    };

    let store = st.store.clone();
    let mut photos = match load_photos(&*store).await {
        Ok(photos) => photos,
        Err(e) => {
            mlog!("posts: read failed: {}", e);
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };
    photos.push(post.clone());

    let encoded = match encode_value(PHOTOS_KEY, &photos) {
        Ok(encoded) => encoded,
        Err(e) => return api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    };
    if let Err(e) = store.set(PHOTOS_KEY, &encoded).await {
        mlog!("posts: write failed: {}", e);
        return api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
    }

    mlog!(
        "posts: {} created {}",
        logging::user_tag(&username),
        logging::post_tag(&post.id)
    );
    (StatusCode::CREATED, axum::Json(post)).into_response()
}

pub async fn feed_handler(State(state): State<SharedState>) -> Response {
    let st = state.lock().await;
    let Some(graph) = st.graph.as_ref() else {
        return not_signed_in();
    };

    let photos = match load_photos(st.store.as_ref()).await {
        Ok(photos) => photos,
        Err(e) => {
            mlog!("feed: read failed: {}", e);
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let feed = compose_feed(&photos, graph.username(), graph.friends(), Utc::now());
    (StatusCode::OK, axum::Json(feed)).into_response()
}

pub async fn explore_handler(State(state): State<SharedState>) -> Response {
    let st = state.lock().await;
    if !st.session.is_signed_in() {
        return not_signed_in();
    }

    let photos = match load_photos(st.store.as_ref()).await {
        Ok(photos) => photos,
        Err(e) => {
            mlog!("explore: read failed: {}", e);
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
        }
    };

    let explore = compose_explore(&photos, Utc::now());
    (StatusCode::OK, axum::Json(explore)).into_response()
}
