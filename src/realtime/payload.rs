use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::notification::model::{ActorSummary, NotifiableBrief};

/// Payload pushed on a `notifications:{recipient}` topic.
///
/// Built fresh at dispatch time from current entity state; `created_at`
/// carries the authoritative ordering for clients (arrival order is not
/// guaranteed).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPush {
    pub action: String,
    pub message: String,
    pub actor: ActorSummary,
    pub notifiable: NotifiableBrief,
    pub created_at: DateTime<Utc>,
}

/// Denormalized micropost snapshot carried by feed payloads so a client can
/// render the update without a follow-up fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MicropostSummary {
    pub id: i64,
    pub content: String,
    pub hashtags: Vec<String>,
    pub like_count: i64,
    pub comment_count: i64,
    pub author: ActorSummary,
    pub created_at: DateTime<Utc>,
}

/// Payload pushed on feed topics when a new micropost is created
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPostPush {
    pub action: String,
    pub micropost: MicropostSummary,
}

impl NewPostPush {
    pub fn new(micropost: MicropostSummary) -> Self {
        Self {
            action: "new_post".to_string(),
            micropost,
        }
    }
}

/// Payload pushed on feed topics when a micropost's reaction counts change
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionUpdatePush {
    pub action: String,
    pub micropost_id: i64,
    pub reaction_counts: HashMap<String, i64>,
}

impl ReactionUpdatePush {
    pub fn new(micropost_id: i64, reaction_counts: HashMap<String, i64>) -> Self {
        Self {
            action: "reaction_update".to_string(),
            micropost_id,
            reaction_counts,
        }
    }
}

/// Payload pushed on feed topics when a micropost is shared
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharePush {
    pub action: String,
    pub micropost: MicropostSummary,
    pub sharer: ActorSummary,
}

impl SharePush {
    pub fn new(micropost: MicropostSummary, sharer: ActorSummary) -> Self {
        Self {
            action: "share_created".to_string(),
            micropost,
            sharer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn sample_author() -> ActorSummary {
        ActorSummary {
            id: Uuid::new_v4(),
            name: "Jane".to_string(),
            avatar_url: Some("https://example.com/jane.png".to_string()),
        }
    }

    #[test]
    fn test_notification_push_shape() {
        let push = NotificationPush {
            action: "followed".to_string(),
            message: "Jane started following you".to_string(),
            actor: sample_author(),
            notifiable: NotifiableBrief {
                id: 3,
                notifiable_type: "follow".to_string(),
            },
            created_at: Utc::now(),
        };
        let json = serde_json::to_string(&push).unwrap();
        assert!(json.contains(r#""action":"followed""#));
        assert!(json.contains(r#""message":"Jane started following you""#));
        assert!(json.contains(r#""type":"follow""#));
    }

    #[test]
    fn test_new_post_push_carries_denormalized_entity() {
        let push = NewPostPush::new(MicropostSummary {
            id: 9,
            content: "hello #rust".to_string(),
            hashtags: vec!["rust".to_string()],
            like_count: 0,
            comment_count: 0,
            author: sample_author(),
            created_at: Utc::now(),
        });
        let json = serde_json::to_string(&push).unwrap();
        assert!(json.contains(r#""action":"new_post""#));
        assert!(json.contains(r#""hashtags":["rust"]"#));
        assert!(json.contains(r#""name":"Jane""#));
    }

    #[test]
    fn test_reaction_update_push_shape() {
        let mut counts = HashMap::new();
        counts.insert("like".to_string(), 2);
        let push = ReactionUpdatePush::new(9, counts);
        let json = serde_json::to_string(&push).unwrap();
        assert!(json.contains(r#""action":"reaction_update""#));
        assert!(json.contains(r#""micropost_id":9"#));
        assert!(json.contains(r#""like":2"#));
    }
}
