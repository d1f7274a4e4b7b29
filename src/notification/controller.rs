use crate::auth::middleware::AuthUser;
use crate::notification::model::{
    MarkAllReadResponse, MarkReadResponse, NotificationError, NotificationErrorResponse,
    NotificationsListResponse, NotificationsQueryParams, ReadFilter, UnreadCountResponse,
};
use crate::notification::service::NotificationService;
use crate::notification::store::default_page_size;
use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use tracing::{error, info};

// Helper function to convert NotificationError to HTTP response
fn notification_error_to_response(
    err: NotificationError,
) -> (StatusCode, Json<NotificationErrorResponse>) {
    let (status, error_message, code) = match err {
        NotificationError::DatabaseError(e) => {
            error!("Database error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error",
                "DB_ERROR",
            )
        }
        NotificationError::CacheError(e) => {
            error!("Cache error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Cache error",
                "CACHE_ERROR",
            )
        }
        NotificationError::NotFound => (
            StatusCode::NOT_FOUND,
            "Notification not found",
            "NOT_FOUND",
        ),
        NotificationError::ValidationFailed(_) => (
            StatusCode::BAD_REQUEST,
            "Invalid notification",
            "VALIDATION_ERROR",
        ),
        NotificationError::InternalError(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            "INTERNAL_ERROR",
        ),
    };

    (
        status,
        Json(NotificationErrorResponse {
            error: error_message.to_string(),
            code: code.to_string(),
        }),
    )
}

/// List notifications for the authenticated user
///
/// Newest first, with offset pagination and an optional read-state filter.
/// The response carries the authoritative unread count for badge
/// reconciliation.
#[utoipa::path(
    get,
    path = "/api/notifications",
    tag = "notifications",
    params(NotificationsQueryParams),
    responses(
        (status = 200, description = "Notifications retrieved", body = NotificationsListResponse),
        (status = 401, description = "Unauthorized", body = NotificationErrorResponse),
        (status = 500, description = "Internal server error", body = NotificationErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_notifications(
    Extension(user): Extension<AuthUser>,
    Extension(notification_service): Extension<Arc<NotificationService>>,
    Query(params): Query<NotificationsQueryParams>,
) -> impl IntoResponse {
    let page = params.page.unwrap_or(1);
    let page_size = params.page_size.unwrap_or_else(default_page_size);
    let filter = params.filter.unwrap_or(ReadFilter::All);

    match notification_service
        .list(user.user_id, page, page_size, filter)
        .await
    {
        Ok((notifications, unread_count)) => (
            StatusCode::OK,
            Json(NotificationsListResponse {
                notifications,
                unread_count,
            }),
        )
            .into_response(),
        Err(e) => notification_error_to_response(e).into_response(),
    }
}

/// Get the authenticated user's unread notification count
///
/// The authoritative value clients reconcile their badge against.
#[utoipa::path(
    get,
    path = "/api/notifications/unread_count",
    tag = "notifications",
    responses(
        (status = 200, description = "Unread count retrieved", body = UnreadCountResponse),
        (status = 401, description = "Unauthorized", body = NotificationErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn unread_count(
    Extension(user): Extension<AuthUser>,
    Extension(notification_service): Extension<Arc<NotificationService>>,
) -> impl IntoResponse {
    match notification_service.unread_count(user.user_id).await {
        Ok(unread_count) => {
            (StatusCode::OK, Json(UnreadCountResponse { unread_count })).into_response()
        }
        Err(e) => notification_error_to_response(e).into_response(),
    }
}

/// Mark one notification as read
///
/// 404 if the notification does not belong to the caller. Marking an
/// already-read notification succeeds and changes nothing.
#[utoipa::path(
    patch,
    path = "/api/notifications/{id}/mark_as_read",
    tag = "notifications",
    params(("id" = i64, Path, description = "The notification to mark as read")),
    responses(
        (status = 200, description = "Notification marked as read", body = MarkReadResponse),
        (status = 404, description = "Notification not found", body = NotificationErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_as_read(
    Path(notification_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Extension(notification_service): Extension<Arc<NotificationService>>,
) -> impl IntoResponse {
    match notification_service
        .mark_as_read(notification_id, user.user_id)
        .await
    {
        Ok(notification) => (
            StatusCode::OK,
            Json(MarkReadResponse {
                success: true,
                notification,
            }),
        )
            .into_response(),
        Err(e) => notification_error_to_response(e).into_response(),
    }
}

/// Mark all of the authenticated user's notifications as read
#[utoipa::path(
    patch,
    path = "/api/notifications/mark_all_as_read",
    tag = "notifications",
    responses(
        (status = 200, description = "All notifications marked as read", body = MarkAllReadResponse),
        (status = 401, description = "Unauthorized", body = NotificationErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn mark_all_as_read(
    Extension(user): Extension<AuthUser>,
    Extension(notification_service): Extension<Arc<NotificationService>>,
) -> impl IntoResponse {
    match notification_service.mark_all_as_read(user.user_id).await {
        Ok(updated) => {
            info!(
                "Marked {} notifications as read for {}",
                updated, user.user_id
            );
            (StatusCode::OK, Json(MarkAllReadResponse { success: true })).into_response()
        }
        Err(e) => notification_error_to_response(e).into_response(),
    }
}
