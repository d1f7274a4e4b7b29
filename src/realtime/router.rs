use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::event::model::EventKind;
use crate::event::source::extract_hashtags;
use crate::notification::model::{ActorSummary, NotifiableBrief};
use crate::realtime::dispatcher::DispatchJob;
use crate::realtime::payload::{
    MicropostSummary, NewPostPush, NotificationPush, ReactionUpdatePush, SharePush,
};
use crate::realtime::topic::{feed_topic, notifications_topic};

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Maps a dispatch job to the topics and payloads it should fan out to.
#[async_trait]
pub trait RouteJobs: Send + Sync {
    async fn route(
        &self,
        job: &DispatchJob,
    ) -> Result<Vec<(String, serde_json::Value)>, RouterError>;
}

/// Human-readable message for a notification action
pub fn message_for_action(action: &str, actor_name: &str) -> String {
    match action {
        "liked" => format!("{} liked your micropost", actor_name),
        "commented" => format!("{} commented on your micropost", actor_name),
        "mentioned" => format!("{} mentioned you in a micropost", actor_name),
        "followed" => format!("{} started following you", actor_name),
        "unfollowed" => format!("{} unfollowed you", actor_name),
        other => format!("{} {}", actor_name, other),
    }
}

/// Production router: resolves display fields and entity snapshots from the
/// system of record at dispatch time, so payloads reflect current state.
/// A subject or actor that vanished since the event is not an error; the
/// job is dropped with a debug line.
pub struct TopicRouter {
    pool: PgPool,
}

impl TopicRouter {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn resolve_actor(&self, user_id: Uuid) -> Result<Option<ActorSummary>, RouterError> {
        let row = sqlx::query("SELECT id, name, avatar_url FROM global.users WHERE id = $1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|row| ActorSummary {
            id: row.get("id"),
            name: row.get("name"),
            avatar_url: row.get("avatar_url"),
        }))
    }

    async fn resolve_micropost(
        &self,
        micropost_id: i64,
    ) -> Result<Option<MicropostSummary>, RouterError> {
        let row = sqlx::query(
            r#"
            SELECT m.id, m.content, m.created_at,
                   u.id AS author_id, u.name AS author_name, u.avatar_url AS author_avatar_url,
                   (SELECT COUNT(*) FROM global.reactions r WHERE r.micropost_id = m.id) AS like_count,
                   (SELECT COUNT(*) FROM global.comments c WHERE c.micropost_id = m.id) AS comment_count
            FROM global.microposts m
            JOIN global.users u ON u.id = m.user_id
            WHERE m.id = $1
            "#,
        )
        .bind(micropost_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let content: String = row.get("content");
            MicropostSummary {
                id: row.get("id"),
                hashtags: extract_hashtags(&content),
                content,
                like_count: row.get("like_count"),
                comment_count: row.get("comment_count"),
                author: ActorSummary {
                    id: row.get("author_id"),
                    name: row.get("author_name"),
                    avatar_url: row.get("author_avatar_url"),
                },
                created_at: row.get("created_at"),
            }
        }))
    }

    async fn follower_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, RouterError> {
        let followers = sqlx::query_scalar::<_, Uuid>(
            "SELECT follower_id FROM global.follows WHERE followed_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(followers)
    }

    async fn reaction_counts(
        &self,
        micropost_id: i64,
    ) -> Result<HashMap<String, i64>, RouterError> {
        let rows = sqlx::query(
            "SELECT kind, COUNT(*) AS count FROM global.reactions WHERE micropost_id = $1 GROUP BY kind",
        )
        .bind(micropost_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| (row.get::<String, _>("kind"), row.get::<i64, _>("count")))
            .collect())
    }

    /// Feed topics for a user's audience: their own feed plus each follower's.
    async fn audience_topics(&self, user_id: Uuid) -> Result<Vec<String>, RouterError> {
        let mut topics = vec![feed_topic(user_id)];
        for follower in self.follower_ids(user_id).await? {
            topics.push(feed_topic(follower));
        }
        Ok(topics)
    }
}

#[async_trait]
impl RouteJobs for TopicRouter {
    async fn route(
        &self,
        job: &DispatchJob,
    ) -> Result<Vec<(String, serde_json::Value)>, RouterError> {
        match job {
            DispatchJob::Notification(notification) => {
                let Some(actor) = self.resolve_actor(notification.actor_id).await? else {
                    debug!(
                        "Actor {} gone, dropping notification {}",
                        notification.actor_id, notification.id
                    );
                    return Ok(Vec::new());
                };

                let push = NotificationPush {
                    action: notification.action.clone(),
                    message: message_for_action(&notification.action, &actor.name),
                    actor,
                    notifiable: NotifiableBrief {
                        id: notification.notifiable_id,
                        notifiable_type: notification.notifiable_type.clone(),
                    },
                    created_at: notification.created_at,
                };

                Ok(vec![(
                    notifications_topic(notification.recipient_id),
                    serde_json::to_value(&push)?,
                )])
            }

            DispatchJob::Feed(event) => match event.kind {
                EventKind::NewPost => {
                    let Some(micropost) = self.resolve_micropost(event.subject.id).await? else {
                        debug!("Micropost {} gone, dropping new_post", event.subject.id);
                        return Ok(Vec::new());
                    };

                    // The author's own feed is excluded; fan out to followers.
                    let payload = serde_json::to_value(&NewPostPush::new(micropost))?;
                    let topics = self.follower_ids(event.actor_id).await?;
                    Ok(topics
                        .into_iter()
                        .map(|follower| (feed_topic(follower), payload.clone()))
                        .collect())
                }

                EventKind::Reacted | EventKind::Liked => {
                    let Some(micropost) = self.resolve_micropost(event.subject.id).await? else {
                        debug!(
                            "Micropost {} gone, dropping reaction_update",
                            event.subject.id
                        );
                        return Ok(Vec::new());
                    };

                    let counts = self.reaction_counts(micropost.id).await?;
                    let payload =
                        serde_json::to_value(&ReactionUpdatePush::new(micropost.id, counts))?;
                    let topics = self.audience_topics(micropost.author.id).await?;
                    Ok(topics
                        .into_iter()
                        .map(|topic| (topic, payload.clone()))
                        .collect())
                }

                EventKind::Shared => {
                    let Some(micropost) = self.resolve_micropost(event.subject.id).await? else {
                        debug!("Micropost {} gone, dropping share", event.subject.id);
                        return Ok(Vec::new());
                    };
                    let Some(sharer) = self.resolve_actor(event.actor_id).await? else {
                        debug!("Sharer {} gone, dropping share", event.actor_id);
                        return Ok(Vec::new());
                    };

                    let payload = serde_json::to_value(&SharePush::new(micropost, sharer))?;
                    let topics = self.audience_topics(event.actor_id).await?;
                    Ok(topics
                        .into_iter()
                        .map(|topic| (topic, payload.clone()))
                        .collect())
                }

                _ => {
                    debug!("No feed routing for {:?}, dropping", event.kind);
                    Ok(Vec::new())
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_lookup_table() {
        assert_eq!(
            message_for_action("liked", "Jane"),
            "Jane liked your micropost"
        );
        assert_eq!(
            message_for_action("commented", "Jane"),
            "Jane commented on your micropost"
        );
        assert_eq!(
            message_for_action("mentioned", "Jane"),
            "Jane mentioned you in a micropost"
        );
        assert_eq!(
            message_for_action("followed", "Jane"),
            "Jane started following you"
        );
        assert_eq!(
            message_for_action("unfollowed", "Jane"),
            "Jane unfollowed you"
        );
    }

    #[test]
    fn test_message_default_falls_back_to_action() {
        assert_eq!(message_for_action("share", "Jane"), "Jane share");
        assert_eq!(message_for_action("reacted", "Jane"), "Jane reacted");
    }
}
