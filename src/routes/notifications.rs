use crate::auth::middleware::auth_middleware;
use crate::notification::controller::{
    list_notifications, mark_all_as_read, mark_as_read, unread_count,
};
use crate::notification::service::NotificationService;
use crate::realtime::gateway::RealtimeGateway;
use crate::websocket::notifications::ws_handler;
use axum::{
    middleware,
    routing::{get, patch},
    Router,
};
use std::sync::Arc;

/// Create a router for the notification REST surface and realtime endpoint
pub fn routes(
    notification_service: Arc<NotificationService>,
    gateway: Arc<RealtimeGateway>,
) -> Router {
    let rest = Router::new()
        .route("/api/notifications", get(list_notifications))
        .route("/api/notifications/unread_count", get(unread_count))
        .route(
            "/api/notifications/:id/mark_as_read",
            patch(mark_as_read),
        )
        .route(
            "/api/notifications/mark_all_as_read",
            patch(mark_all_as_read),
        )
        .route_layer(middleware::from_fn(auth_middleware))
        .layer(axum::extract::Extension(notification_service));

    // The websocket authenticates via query token during the upgrade
    let realtime = Router::new()
        .route("/api/notifications/ws", get(ws_handler))
        .with_state(gateway);

    rest.merge(realtime)
}
