use std::sync::Arc;

use sqlx::{PgPool, Row};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::event::source::{extract_mentions, EventSource};
use crate::social::model::{
    Comment, Follow, Micropost, Reaction, Share, SocialError,
};

/// The system-of-record writes that feed the notification pipeline.
///
/// Each write commits first, then hands the resolved facts (owner ids,
/// mentioned users) to the event source. Event-side failures never surface
/// here.
pub struct SocialService {
    pool: PgPool,
    events: Arc<EventSource>,
}

impl SocialService {
    pub fn new(pool: PgPool, events: Arc<EventSource>) -> Self {
        Self { pool, events }
    }

    async fn micropost_owner(&self, micropost_id: i64) -> Result<Uuid, SocialError> {
        let row = sqlx::query("SELECT user_id FROM global.microposts WHERE id = $1")
            .bind(micropost_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.get("user_id")),
            None => Err(SocialError::MicropostNotFound),
        }
    }

    async fn user_exists(&self, user_id: Uuid) -> Result<bool, SocialError> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM global.users WHERE id = $1)")
                .bind(user_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    /// Resolve `@name` handles to user ids, skipping unknown names.
    async fn resolve_mentions(&self, content: &str) -> Result<Vec<Uuid>, SocialError> {
        let handles = extract_mentions(content);
        if handles.is_empty() {
            return Ok(Vec::new());
        }

        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM global.users WHERE username = ANY($1)",
        )
        .bind(&handles)
        .fetch_all(&self.pool)
        .await?;

        if ids.len() < handles.len() {
            warn!(
                "{} of {} mentioned handles did not resolve",
                handles.len() - ids.len(),
                handles.len()
            );
        }
        Ok(ids)
    }

    pub async fn create_micropost(
        &self,
        author_id: Uuid,
        content: &str,
    ) -> Result<Micropost, SocialError> {
        let micropost = sqlx::query_as::<_, Micropost>(
            r#"
            INSERT INTO global.microposts (user_id, content)
            VALUES ($1, $2)
            RETURNING *
            "#,
        )
        .bind(author_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        info!("User {} created micropost {}", author_id, micropost.id);

        // The micropost is committed; event-side failures stay here
        self.events.micropost_created(author_id, micropost.id);
        match self.resolve_mentions(content).await {
            Ok(mentioned) => {
                self.events
                    .mentions_detected(author_id, micropost.id, &mentioned)
                    .await;
            }
            Err(e) => {
                error!(
                    "Failed to resolve mentions for micropost {}: {}",
                    micropost.id, e
                );
            }
        }

        Ok(micropost)
    }

    pub async fn create_comment(
        &self,
        actor_id: Uuid,
        micropost_id: i64,
        content: &str,
    ) -> Result<Comment, SocialError> {
        let owner_id = self.micropost_owner(micropost_id).await?;

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO global.comments (micropost_id, user_id, content)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(micropost_id)
        .bind(actor_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "User {} commented on micropost {} (comment {})",
            actor_id, micropost_id, comment.id
        );

        self.events
            .comment_created(actor_id, owner_id, comment.id)
            .await;

        Ok(comment)
    }

    /// Create or change a reaction. Only the first reaction per
    /// (user, micropost) produces a notification; a kind change updates the
    /// row in place and refreshes feed counts.
    pub async fn react(
        &self,
        actor_id: Uuid,
        micropost_id: i64,
        kind: &str,
    ) -> Result<Reaction, SocialError> {
        let owner_id = self.micropost_owner(micropost_id).await?;

        let existing = sqlx::query_as::<_, Reaction>(
            "SELECT * FROM global.reactions WHERE micropost_id = $1 AND user_id = $2",
        )
        .bind(micropost_id)
        .bind(actor_id)
        .fetch_optional(&self.pool)
        .await?;

        let (reaction, first_reaction) = match existing {
            None => {
                let reaction = sqlx::query_as::<_, Reaction>(
                    r#"
                    INSERT INTO global.reactions (micropost_id, user_id, kind)
                    VALUES ($1, $2, $3)
                    RETURNING *
                    "#,
                )
                .bind(micropost_id)
                .bind(actor_id)
                .bind(kind)
                .fetch_one(&self.pool)
                .await?;
                (reaction, true)
            }
            Some(previous) => {
                let reaction = sqlx::query_as::<_, Reaction>(
                    r#"
                    UPDATE global.reactions
                    SET kind = $1, updated_at = now()
                    WHERE id = $2
                    RETURNING *
                    "#,
                )
                .bind(kind)
                .bind(previous.id)
                .fetch_one(&self.pool)
                .await?;
                (reaction, false)
            }
        };

        self.events
            .reaction_created(actor_id, owner_id, micropost_id, reaction.id, first_reaction)
            .await;

        Ok(reaction)
    }

    /// Idempotent follow: re-following returns the existing relationship
    /// without a second notification.
    pub async fn follow(&self, actor_id: Uuid, followed_id: Uuid) -> Result<Follow, SocialError> {
        if actor_id == followed_id {
            return Err(SocialError::SelfFollow);
        }
        if !self.user_exists(followed_id).await? {
            return Err(SocialError::UserNotFound);
        }

        let inserted = sqlx::query_as::<_, Follow>(
            r#"
            INSERT INTO global.follows (follower_id, followed_id)
            VALUES ($1, $2)
            ON CONFLICT (follower_id, followed_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(actor_id)
        .bind(followed_id)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(follow) => {
                info!("User {} followed {}", actor_id, followed_id);
                self.events
                    .follow_created(actor_id, followed_id, follow.id)
                    .await;
                Ok(follow)
            }
            None => {
                let follow = sqlx::query_as::<_, Follow>(
                    "SELECT * FROM global.follows WHERE follower_id = $1 AND followed_id = $2",
                )
                .bind(actor_id)
                .bind(followed_id)
                .fetch_one(&self.pool)
                .await?;
                Ok(follow)
            }
        }
    }

    pub async fn unfollow(&self, actor_id: Uuid, followed_id: Uuid) -> Result<(), SocialError> {
        let deleted = sqlx::query(
            "DELETE FROM global.follows WHERE follower_id = $1 AND followed_id = $2 RETURNING id",
        )
        .bind(actor_id)
        .bind(followed_id)
        .fetch_optional(&self.pool)
        .await?;

        match deleted {
            Some(row) => {
                info!("User {} unfollowed {}", actor_id, followed_id);
                self.events
                    .follow_destroyed(actor_id, followed_id, row.get("id"))
                    .await;
                Ok(())
            }
            None => Err(SocialError::FollowNotFound),
        }
    }

    /// Idempotent share: re-sharing returns the existing row without a
    /// second notification.
    pub async fn share(&self, actor_id: Uuid, micropost_id: i64) -> Result<Share, SocialError> {
        let owner_id = self.micropost_owner(micropost_id).await?;

        let inserted = sqlx::query_as::<_, Share>(
            r#"
            INSERT INTO global.shares (micropost_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (micropost_id, user_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(micropost_id)
        .bind(actor_id)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(share) => {
                info!("User {} shared micropost {}", actor_id, micropost_id);
                self.events
                    .share_created(actor_id, owner_id, micropost_id, share.id)
                    .await;
                Ok(share)
            }
            None => {
                let share = sqlx::query_as::<_, Share>(
                    "SELECT * FROM global.shares WHERE micropost_id = $1 AND user_id = $2",
                )
                .bind(micropost_id)
                .bind(actor_id)
                .fetch_one(&self.pool)
                .await?;
                Ok(share)
            }
        }
    }
}
