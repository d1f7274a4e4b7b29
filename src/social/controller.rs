use crate::auth::middleware::AuthUser;
use crate::social::model::{
    CreateCommentRequest, CreateMicropostRequest, ReactionRequest, SocialError,
    SocialErrorResponse,
};
use crate::social::service::SocialService;
use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

const MAX_MICROPOST_LENGTH: usize = 280;
const MAX_COMMENT_LENGTH: usize = 1000;
const ALLOWED_REACTION_KINDS: [&str; 6] = ["like", "love", "laugh", "wow", "sad", "angry"];

// Helper function to convert SocialError to HTTP response
fn social_error_to_response(err: SocialError) -> (StatusCode, Json<SocialErrorResponse>) {
    let (status, error_message, code) = match err {
        SocialError::DatabaseError(e) => {
            error!("Database error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Database error".to_string(),
                "DB_ERROR",
            )
        }
        SocialError::MicropostNotFound => (
            StatusCode::NOT_FOUND,
            "Micropost not found".to_string(),
            "NOT_FOUND",
        ),
        SocialError::UserNotFound => (
            StatusCode::NOT_FOUND,
            "User not found".to_string(),
            "USER_NOT_FOUND",
        ),
        SocialError::FollowNotFound => (
            StatusCode::NOT_FOUND,
            "Follow relationship not found".to_string(),
            "FOLLOW_NOT_FOUND",
        ),
        SocialError::SelfFollow => (
            StatusCode::BAD_REQUEST,
            "Users cannot follow themselves".to_string(),
            "SELF_FOLLOW",
        ),
        SocialError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg, "VALIDATION_ERROR"),
    };

    (
        status,
        Json(SocialErrorResponse {
            error: error_message,
            code: code.to_string(),
        }),
    )
}

/// Create a new micropost
///
/// Fans out to follower feeds and notifies any mentioned users.
#[utoipa::path(
    post,
    path = "/api/microposts",
    tag = "social",
    request_body = CreateMicropostRequest,
    responses(
        (status = 201, description = "Micropost created", body = Micropost),
        (status = 400, description = "Invalid input", body = SocialErrorResponse),
        (status = 401, description = "Unauthorized", body = SocialErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_micropost(
    Extension(user): Extension<AuthUser>,
    Extension(social_service): Extension<Arc<SocialService>>,
    Json(request): Json<CreateMicropostRequest>,
) -> impl IntoResponse {
    if request.content.trim().is_empty() {
        return social_error_to_response(SocialError::ValidationError(
            "Micropost content cannot be empty".to_string(),
        ))
        .into_response();
    }
    if request.content.chars().count() > MAX_MICROPOST_LENGTH {
        return social_error_to_response(SocialError::ValidationError(
            "Micropost content exceeds maximum length".to_string(),
        ))
        .into_response();
    }

    match social_service
        .create_micropost(user.user_id, &request.content)
        .await
    {
        Ok(micropost) => {
            info!("Created micropost {}", micropost.id);
            (StatusCode::CREATED, Json(micropost)).into_response()
        }
        Err(e) => social_error_to_response(e).into_response(),
    }
}

/// Comment on a micropost
///
/// Notifies the micropost's owner unless they are the commenter.
#[utoipa::path(
    post,
    path = "/api/microposts/{id}/comments",
    tag = "social",
    params(("id" = i64, Path, description = "The micropost to comment on")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment created", body = Comment),
        (status = 400, description = "Invalid input", body = SocialErrorResponse),
        (status = 404, description = "Micropost not found", body = SocialErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn create_comment(
    Path(micropost_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Extension(social_service): Extension<Arc<SocialService>>,
    Json(request): Json<CreateCommentRequest>,
) -> impl IntoResponse {
    if request.content.trim().is_empty() {
        return social_error_to_response(SocialError::ValidationError(
            "Comment content cannot be empty".to_string(),
        ))
        .into_response();
    }
    if request.content.chars().count() > MAX_COMMENT_LENGTH {
        return social_error_to_response(SocialError::ValidationError(
            "Comment content exceeds maximum length".to_string(),
        ))
        .into_response();
    }

    match social_service
        .create_comment(user.user_id, micropost_id, &request.content)
        .await
    {
        Ok(comment) => (StatusCode::CREATED, Json(comment)).into_response(),
        Err(e) => social_error_to_response(e).into_response(),
    }
}

/// React to a micropost
///
/// The first reaction notifies the owner; changing the reaction kind only
/// updates feed counts.
#[utoipa::path(
    put,
    path = "/api/microposts/{id}/reaction",
    tag = "social",
    params(("id" = i64, Path, description = "The micropost to react to")),
    request_body = ReactionRequest,
    responses(
        (status = 200, description = "Reaction set", body = Reaction),
        (status = 400, description = "Invalid reaction kind", body = SocialErrorResponse),
        (status = 404, description = "Micropost not found", body = SocialErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn react(
    Path(micropost_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Extension(social_service): Extension<Arc<SocialService>>,
    Json(request): Json<ReactionRequest>,
) -> impl IntoResponse {
    if !ALLOWED_REACTION_KINDS.contains(&request.kind.as_str()) {
        return social_error_to_response(SocialError::ValidationError(format!(
            "Unknown reaction kind: {}",
            request.kind
        )))
        .into_response();
    }

    match social_service
        .react(user.user_id, micropost_id, &request.kind)
        .await
    {
        Ok(reaction) => (StatusCode::OK, Json(reaction)).into_response(),
        Err(e) => social_error_to_response(e).into_response(),
    }
}

/// Share a micropost
///
/// Notifies the micropost's owner and fans the share out to the sharer's
/// followers. Re-sharing is an idempotent no-op.
#[utoipa::path(
    post,
    path = "/api/microposts/{id}/share",
    tag = "social",
    params(("id" = i64, Path, description = "The micropost to share")),
    responses(
        (status = 201, description = "Share created", body = Share),
        (status = 404, description = "Micropost not found", body = SocialErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn share(
    Path(micropost_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Extension(social_service): Extension<Arc<SocialService>>,
) -> impl IntoResponse {
    match social_service.share(user.user_id, micropost_id).await {
        Ok(share) => (StatusCode::CREATED, Json(share)).into_response(),
        Err(e) => social_error_to_response(e).into_response(),
    }
}

/// Follow a user
#[utoipa::path(
    post,
    path = "/api/users/{id}/follow",
    tag = "social",
    params(("id" = Uuid, Path, description = "The user to follow")),
    responses(
        (status = 201, description = "Follow created", body = Follow),
        (status = 400, description = "Cannot follow yourself", body = SocialErrorResponse),
        (status = 404, description = "User not found", body = SocialErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn follow(
    Path(followed_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Extension(social_service): Extension<Arc<SocialService>>,
) -> impl IntoResponse {
    match social_service.follow(user.user_id, followed_id).await {
        Ok(follow) => (StatusCode::CREATED, Json(follow)).into_response(),
        Err(e) => social_error_to_response(e).into_response(),
    }
}

/// Unfollow a user
#[utoipa::path(
    delete,
    path = "/api/users/{id}/follow",
    tag = "social",
    params(("id" = Uuid, Path, description = "The user to unfollow")),
    responses(
        (status = 200, description = "Follow removed"),
        (status = 404, description = "Follow relationship not found", body = SocialErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn unfollow(
    Path(followed_id): Path<Uuid>,
    Extension(user): Extension<AuthUser>,
    Extension(social_service): Extension<Arc<SocialService>>,
) -> impl IntoResponse {
    match social_service.unfollow(user.user_id, followed_id).await {
        Ok(()) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Err(e) => social_error_to_response(e).into_response(),
    }
}
