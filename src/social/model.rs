use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Database model for a micropost
#[derive(Debug, FromRow, Clone, Serialize, Deserialize, ToSchema)]
pub struct Micropost {
    pub id: i64,
    #[schema(value_type = UuidWrapper)]
    pub user_id: Uuid,
    pub content: String,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
}

/// Database model for a comment
#[derive(Debug, FromRow, Clone, Serialize, Deserialize, ToSchema)]
pub struct Comment {
    pub id: i64,
    pub micropost_id: i64,
    #[schema(value_type = UuidWrapper)]
    pub user_id: Uuid,
    pub content: String,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
}

/// Database model for a reaction. One row per (micropost, user); changing
/// kind updates in place.
#[derive(Debug, FromRow, Clone, Serialize, Deserialize, ToSchema)]
pub struct Reaction {
    pub id: i64,
    pub micropost_id: i64,
    #[schema(value_type = UuidWrapper)]
    pub user_id: Uuid,
    pub kind: String,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = DateTimeWrapper)]
    pub updated_at: DateTime<Utc>,
}

/// Database model for a follow relationship
#[derive(Debug, FromRow, Clone, Serialize, Deserialize, ToSchema)]
pub struct Follow {
    pub id: i64,
    #[schema(value_type = UuidWrapper)]
    pub follower_id: Uuid,
    #[schema(value_type = UuidWrapper)]
    pub followed_id: Uuid,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
}

/// Database model for a share
#[derive(Debug, FromRow, Clone, Serialize, Deserialize, ToSchema)]
pub struct Share {
    pub id: i64,
    pub micropost_id: i64,
    #[schema(value_type = UuidWrapper)]
    pub user_id: Uuid,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
}

/// Request to create a micropost
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateMicropostRequest {
    #[schema(example = "Hello world #rust")]
    pub content: String,
}

/// Request to comment on a micropost
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateCommentRequest {
    #[schema(example = "Nice post!")]
    pub content: String,
}

/// Request to set a reaction on a micropost
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct ReactionRequest {
    #[schema(example = "like")]
    pub kind: String,
}

/// Possible social write errors
#[derive(Debug, thiserror::Error)]
pub enum SocialError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Micropost not found")]
    MicropostNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Follow relationship not found")]
    FollowNotFound,

    #[error("Users cannot follow themselves")]
    SelfFollow,

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Error response for the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SocialErrorResponse {
    #[schema(example = "Micropost not found")]
    pub error: String,
    #[schema(example = "NOT_FOUND")]
    pub code: String,
}
