//! Axum router construction.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::web::handlers;
use crate::web::state::SharedState;

/// Build the complete Axum router with all API routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        // Health
        .route("/api/health", get(handlers::health::health_handler))
        // Identity session
        .route("/api/auth/signup", post(handlers::auth::signup_handler))
        .route("/api/auth/login", post(handlers::auth::login_handler))
        .route("/api/auth/logout", post(handlers::auth::logout_handler))
        .route("/api/auth/session", get(handlers::auth::session_handler))
        // Directory search
        .route(
            "/api/users/search",
            get(handlers::friends::search_users_handler),
        )
        // Friends
        .route("/api/friends", get(handlers::friends::list_friends_handler))
        .route(
            "/api/friends/:username",
            delete(handlers::friends::remove_friend_handler),
        )
        // Friend requests
        .route(
            "/api/friend-requests",
            get(handlers::friends::list_friend_requests_handler)
                .post(handlers::friends::send_friend_request_handler),
        )
        .route(
            "/api/friend-requests/:username/accept",
            post(handlers::friends::accept_friend_request_handler),
        )
        .route(
            "/api/friend-requests/:username/reject",
            post(handlers::friends::reject_friend_request_handler),
        )
        // Posts and feeds
        .route("/api/posts", post(handlers::posts::create_post_handler))
        .route("/api/feed", get(handlers::posts::feed_handler))
        .route("/api/explore", get(handlers::posts::explore_handler))
        .with_state(state)
}
