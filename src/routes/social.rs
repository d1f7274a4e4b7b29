use crate::auth::middleware::auth_middleware;
use crate::social::controller::{
    create_comment, create_micropost, follow, react, share, unfollow,
};
use crate::social::service::SocialService;
use axum::{
    middleware,
    routing::{post, put},
    Router,
};
use std::sync::Arc;

/// Create a router for the notification-worthy social writes
pub fn routes(social_service: Arc<SocialService>) -> Router {
    Router::new()
        .route("/api/microposts", post(create_micropost))
        .route("/api/microposts/:id/comments", post(create_comment))
        .route("/api/microposts/:id/reaction", put(react))
        .route("/api/microposts/:id/share", post(share))
        .route("/api/users/:id/follow", post(follow).delete(unfollow))
        .route_layer(middleware::from_fn(auth_middleware))
        .layer(axum::extract::Extension(social_service))
}
