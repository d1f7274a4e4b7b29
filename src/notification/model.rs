use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::event::model::{SubjectKind, SubjectRef};

/// Database model for a notification
#[derive(Debug, FromRow, Clone, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: i64,
    #[schema(value_type = UuidWrapper)]
    pub recipient_id: Uuid,
    #[schema(value_type = UuidWrapper)]
    pub actor_id: Uuid,
    pub action: String,
    pub notifiable_type: String,
    pub notifiable_id: i64,
    pub read: bool,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn notifiable(&self) -> Option<SubjectRef> {
        SubjectKind::from_str(&self.notifiable_type)
            .map(|kind| SubjectRef::new(kind, self.notifiable_id))
    }
}

/// A notification row joined with the actor's display fields
#[derive(Debug, FromRow, Clone)]
pub struct NotificationWithActor {
    pub id: i64,
    pub recipient_id: Uuid,
    pub actor_id: Uuid,
    pub action: String,
    pub notifiable_type: String,
    pub notifiable_id: i64,
    pub read: bool,
    pub created_at: DateTime<Utc>,
    pub actor_name: String,
    pub actor_avatar_url: Option<String>,
}

/// Actor display fields embedded in responses and push payloads
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActorSummary {
    #[schema(value_type = UuidWrapper)]
    pub id: Uuid,
    #[schema(example = "Jane Doe")]
    pub name: String,
    pub avatar_url: Option<String>,
}

/// The subject reference as serialized in responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NotifiableBrief {
    #[schema(example = "42")]
    pub id: i64,
    #[serde(rename = "type")]
    #[schema(example = "micropost")]
    pub notifiable_type: String,
}

/// Response format for a single notification
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationResponse {
    pub id: i64,
    #[schema(example = "followed")]
    pub action: String,
    pub read: bool,
    #[schema(value_type = DateTimeWrapper)]
    pub created_at: DateTime<Utc>,
    pub actor: ActorSummary,
    pub notifiable: NotifiableBrief,
}

impl From<NotificationWithActor> for NotificationResponse {
    fn from(row: NotificationWithActor) -> Self {
        Self {
            id: row.id,
            action: row.action,
            read: row.read,
            created_at: row.created_at,
            actor: ActorSummary {
                id: row.actor_id,
                name: row.actor_name,
                avatar_url: row.actor_avatar_url,
            },
            notifiable: NotifiableBrief {
                id: row.notifiable_id,
                notifiable_type: row.notifiable_type,
            },
        }
    }
}

/// Response for the notification list endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationsListResponse {
    pub notifications: Vec<NotificationResponse>,
    #[schema(example = "3")]
    pub unread_count: i64,
}

/// Response for the unread count endpoint
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UnreadCountResponse {
    #[schema(example = "3")]
    pub unread_count: i64,
}

/// Response for marking a single notification as read
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MarkReadResponse {
    pub success: bool,
    pub notification: Notification,
}

/// Response for marking all notifications as read
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MarkAllReadResponse {
    pub success: bool,
}

/// Read-state filter for the list endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReadFilter {
    Read,
    Unread,
    #[default]
    All,
}

/// Query parameters for the list endpoint
#[derive(Debug, Deserialize, ToSchema, IntoParams)]
pub struct NotificationsQueryParams {
    #[schema(example = "1")]
    pub page: Option<i64>,
    #[schema(example = "20")]
    pub page_size: Option<i64>,
    pub filter: Option<ReadFilter>,
}

/// Possible notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Cache error: {0}")]
    CacheError(#[from] redis::RedisError),

    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    #[error("Notification not found")]
    NotFound,

    #[error("Internal error: {0}")]
    InternalError(String),
}

/// Error response for the API
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct NotificationErrorResponse {
    #[schema(example = "Notification not found")]
    pub error: String,
    #[schema(example = "NOT_FOUND")]
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_row() -> NotificationWithActor {
        NotificationWithActor {
            id: 7,
            recipient_id: Uuid::new_v4(),
            actor_id: Uuid::parse_str("123e4567-e89b-12d3-a456-426614174000").unwrap(),
            action: "followed".to_string(),
            notifiable_type: "follow".to_string(),
            notifiable_id: 3,
            read: false,
            created_at: Utc::now(),
            actor_name: "Jane".to_string(),
            actor_avatar_url: None,
        }
    }

    #[test]
    fn test_notification_response_shape() {
        let response = NotificationResponse::from(sample_row());
        let json = serde_json::to_string(&response).unwrap();

        assert!(json.contains(r#""action":"followed""#));
        assert!(json.contains(r#""read":false"#));
        assert!(json.contains(r#""name":"Jane""#));
        // notifiable serializes its kind under "type"
        assert!(json.contains(r#""type":"follow""#));
    }

    #[test]
    fn test_notifiable_accessor() {
        let notification = Notification {
            id: 1,
            recipient_id: Uuid::new_v4(),
            actor_id: Uuid::new_v4(),
            action: "liked".to_string(),
            notifiable_type: "micropost".to_string(),
            notifiable_id: 42,
            read: false,
            created_at: Utc::now(),
        };
        let subject = notification.notifiable().unwrap();
        assert_eq!(subject.id, 42);
        assert_eq!(subject.kind, SubjectKind::Micropost);
    }

    #[test]
    fn test_read_filter_deserialization() {
        #[derive(Deserialize)]
        struct Params {
            filter: ReadFilter,
        }
        let params: Params = serde_json::from_str(r#"{"filter":"unread"}"#).unwrap();
        assert_eq!(params.filter, ReadFilter::Unread);
        let params: Params = serde_json::from_str(r#"{"filter":"all"}"#).unwrap();
        assert_eq!(params.filter, ReadFilter::All);
        assert_eq!(ReadFilter::default(), ReadFilter::All);
    }
}
