use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use tracing::{debug, error};
use uuid::Uuid;

use crate::event::model::{DomainEvent, EventKind, SubjectKind, SubjectRef};
use crate::notification::service::NotificationService;

/// Turns committed domain writes into notifications and feed dispatches.
///
/// Called by the system-of-record service after each write commits, with
/// the ownership facts already resolved. Nothing here may fail the
/// triggering write: every error is caught and logged.
pub struct EventSource {
    notifications: Arc<NotificationService>,
    notify_on_unfollow: bool,
}

/// Self-notifications are suppressed before creation for every kind except
/// follows (self-follow is disallowed upstream) and feed-only posts.
pub fn suppress_self_notification(kind: EventKind, actor_id: Uuid, recipient_id: Uuid) -> bool {
    match kind {
        EventKind::Followed | EventKind::Unfollowed | EventKind::NewPost => false,
        _ => actor_id == recipient_id,
    }
}

/// `@name` handles in micropost content, deduplicated, in order of first
/// appearance.
pub fn extract_mentions(content: &str) -> Vec<String> {
    static MENTION_RE: OnceLock<Regex> = OnceLock::new();
    let re = MENTION_RE.get_or_init(|| Regex::new(r"@([A-Za-z0-9_]+)").unwrap());
    collect_unique(re, content)
}

/// `#tag` markers in micropost content, deduplicated, in order of first
/// appearance.
pub fn extract_hashtags(content: &str) -> Vec<String> {
    static HASHTAG_RE: OnceLock<Regex> = OnceLock::new();
    let re = HASHTAG_RE.get_or_init(|| Regex::new(r"#([A-Za-z0-9_]+)").unwrap());
    collect_unique(re, content)
}

fn collect_unique(re: &Regex, content: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for capture in re.captures_iter(content) {
        let name = capture[1].to_string();
        if !seen.contains(&name) {
            seen.push(name);
        }
    }
    seen
}

impl EventSource {
    pub fn new(notifications: Arc<NotificationService>, notify_on_unfollow: bool) -> Self {
        Self {
            notifications,
            notify_on_unfollow,
        }
    }

    /// A new micropost fans out to follower feeds; it never creates a
    /// notification row of its own.
    pub fn micropost_created(&self, author_id: Uuid, micropost_id: i64) {
        self.notifications.publish_feed_event(DomainEvent::new(
            EventKind::NewPost,
            author_id,
            SubjectRef::new(SubjectKind::Micropost, micropost_id),
        ));
    }

    /// Mentions resolved from a micropost's content. The author mentioning
    /// themselves is ignored.
    pub async fn mentions_detected(
        &self,
        actor_id: Uuid,
        micropost_id: i64,
        mentioned_user_ids: &[Uuid],
    ) {
        for &mentioned in mentioned_user_ids {
            self.notify_quietly(
                mentioned,
                actor_id,
                EventKind::Mentioned,
                SubjectRef::new(SubjectKind::Micropost, micropost_id),
            )
            .await;
        }
    }

    pub async fn comment_created(
        &self,
        actor_id: Uuid,
        post_owner_id: Uuid,
        comment_id: i64,
    ) {
        self.notify_quietly(
            post_owner_id,
            actor_id,
            EventKind::Commented,
            SubjectRef::new(SubjectKind::Comment, comment_id),
        )
        .await;
    }

    /// First reaction notifies the post owner; a later change of reaction
    /// kind only refreshes feed counts.
    pub async fn reaction_created(
        &self,
        actor_id: Uuid,
        post_owner_id: Uuid,
        micropost_id: i64,
        reaction_id: i64,
        first_reaction: bool,
    ) {
        if first_reaction {
            self.notify_quietly(
                post_owner_id,
                actor_id,
                EventKind::Reacted,
                SubjectRef::new(SubjectKind::Reaction, reaction_id),
            )
            .await;
        }

        self.notifications.publish_feed_event(DomainEvent::new(
            EventKind::Reacted,
            actor_id,
            SubjectRef::new(SubjectKind::Micropost, micropost_id),
        ));
    }

    pub async fn follow_created(&self, actor_id: Uuid, followed_id: Uuid, follow_id: i64) {
        self.notify_quietly(
            followed_id,
            actor_id,
            EventKind::Followed,
            SubjectRef::new(SubjectKind::Follow, follow_id),
        )
        .await;
    }

    pub async fn follow_destroyed(&self, actor_id: Uuid, followed_id: Uuid, follow_id: i64) {
        if !self.notify_on_unfollow {
            debug!("Unfollow notifications disabled, skipping");
            return;
        }
        self.notify_quietly(
            followed_id,
            actor_id,
            EventKind::Unfollowed,
            SubjectRef::new(SubjectKind::Follow, follow_id),
        )
        .await;
    }

    pub async fn share_created(
        &self,
        actor_id: Uuid,
        post_owner_id: Uuid,
        micropost_id: i64,
        share_id: i64,
    ) {
        self.notify_quietly(
            post_owner_id,
            actor_id,
            EventKind::Shared,
            SubjectRef::new(SubjectKind::Share, share_id),
        )
        .await;

        self.notifications.publish_feed_event(DomainEvent::new(
            EventKind::Shared,
            actor_id,
            SubjectRef::new(SubjectKind::Micropost, micropost_id),
        ));
    }

    async fn notify_quietly(
        &self,
        recipient_id: Uuid,
        actor_id: Uuid,
        kind: EventKind,
        subject: SubjectRef,
    ) {
        if suppress_self_notification(kind, actor_id, recipient_id) {
            debug!(
                "Suppressing self-notification ({}) for user {}",
                kind.as_str(),
                actor_id
            );
            return;
        }

        if let Err(e) = self
            .notifications
            .notify_event(recipient_id, actor_id, kind, subject)
            .await
        {
            error!(
                "Failed to create {} notification for {}: {}",
                kind.as_str(),
                recipient_id,
                e
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::model::ReadFilter;
    use crate::notification::store::testing::InMemoryNotificationStore;
    use crate::notification::store::NotificationStore;
    use crate::realtime::dispatcher::{BroadcastDispatcher, DispatchJob};
    use crate::realtime::gateway::RealtimeGateway;
    use crate::realtime::router::{message_for_action, RouteJobs, RouterError};
    use crate::realtime::topic::notifications_topic;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::HashMap;
    use std::time::Duration;

    /// Resolves actor names from a fixture map instead of the database.
    struct FixtureRouter {
        names: HashMap<Uuid, String>,
    }

    #[async_trait]
    impl RouteJobs for FixtureRouter {
        async fn route(
            &self,
            job: &DispatchJob,
        ) -> Result<Vec<(String, serde_json::Value)>, RouterError> {
            match job {
                DispatchJob::Notification(n) => {
                    let Some(name) = self.names.get(&n.actor_id) else {
                        return Ok(Vec::new());
                    };
                    Ok(vec![(
                        notifications_topic(n.recipient_id),
                        json!({
                            "action": n.action,
                            "message": message_for_action(&n.action, name),
                            "actor": { "name": name },
                        }),
                    )])
                }
                DispatchJob::Feed(_) => Ok(Vec::new()),
            }
        }
    }

    struct Fixture {
        store: Arc<InMemoryNotificationStore>,
        gateway: Arc<RealtimeGateway>,
        source: EventSource,
    }

    fn fixture(names: &[(Uuid, &str)], notify_on_unfollow: bool) -> Fixture {
        let mut store = InMemoryNotificationStore::new();
        for (id, name) in names {
            store = store.with_actor(*id, name);
        }
        let store = Arc::new(store);
        let gateway = Arc::new(RealtimeGateway::new(8));
        let dispatcher = BroadcastDispatcher::start(
            Arc::new(FixtureRouter {
                names: names
                    .iter()
                    .map(|(id, name)| (*id, name.to_string()))
                    .collect(),
            }),
            gateway.clone(),
            16,
        );
        let notifications = Arc::new(NotificationService::new(
            store.clone(),
            dispatcher,
            None,
        ));
        Fixture {
            store,
            gateway,
            source: EventSource::new(notifications, notify_on_unfollow),
        }
    }

    #[test]
    fn test_extract_mentions() {
        assert_eq!(
            extract_mentions("hi @alice and @bob, thanks @alice"),
            vec!["alice", "bob"]
        );
        assert!(extract_mentions("no mentions here").is_empty());
        assert_eq!(extract_mentions("email a@b is not a handle"), vec!["b"]);
    }

    #[test]
    fn test_extract_hashtags() {
        assert_eq!(
            extract_hashtags("shipping #rust #async today, more #rust"),
            vec!["rust", "async"]
        );
        assert!(extract_hashtags("plain text").is_empty());
    }

    #[test]
    fn test_self_suppression_table() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        for kind in [
            EventKind::Liked,
            EventKind::Commented,
            EventKind::Mentioned,
            EventKind::Shared,
            EventKind::Reacted,
        ] {
            assert!(suppress_self_notification(kind, me, me));
            assert!(!suppress_self_notification(kind, me, other));
        }
        assert!(!suppress_self_notification(EventKind::Followed, me, me));
        assert!(!suppress_self_notification(EventKind::Unfollowed, me, me));
    }

    #[tokio::test]
    async fn test_follow_creates_row_and_pushes_payload() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        let fx = fixture(&[(x, "X"), (y, "Y")], false);

        let (conn, mut rx) = fx.gateway.connect(y);
        fx.gateway.subscribe(conn, &notifications_topic(y));

        fx.source.follow_created(x, y, 1).await;

        let rows = fx.store.all();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].recipient_id, y);
        assert_eq!(rows[0].actor_id, x);
        assert_eq!(rows[0].action, "followed");
        assert_eq!(fx.store.unread_count(y).await.unwrap(), 1);

        let text = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("push timed out")
            .unwrap();
        assert!(text.contains(r#""action":"followed""#));
        assert!(text.contains(r#""name":"X""#));
    }

    #[tokio::test]
    async fn test_commenting_on_own_post_is_suppressed() {
        let x = Uuid::new_v4();
        let fx = fixture(&[(x, "X")], false);

        fx.source.comment_created(x, x, 1).await;

        assert!(fx.store.all().is_empty());
        assert_eq!(fx.store.unread_count(x).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_reaction_change_does_not_renotify() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        let fx = fixture(&[(x, "X"), (y, "Y")], false);

        fx.source.reaction_created(x, y, 9, 1, true).await;
        assert_eq!(fx.store.all().len(), 1);

        // Changing the reaction kind is not a first reaction
        fx.source.reaction_created(x, y, 9, 1, false).await;
        assert_eq!(fx.store.all().len(), 1);
    }

    #[tokio::test]
    async fn test_self_reaction_and_self_mention_suppressed() {
        let x = Uuid::new_v4();
        let fx = fixture(&[(x, "X")], false);

        fx.source.reaction_created(x, x, 9, 1, true).await;
        fx.source.mentions_detected(x, 9, &[x]).await;
        fx.source.share_created(x, x, 9, 1).await;

        assert!(fx.store.all().is_empty());
    }

    #[tokio::test]
    async fn test_unfollow_notification_is_config_gated() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();

        let off = fixture(&[(x, "X"), (y, "Y")], false);
        off.source.follow_destroyed(x, y, 1).await;
        assert!(off.store.all().is_empty());

        let on = fixture(&[(x, "X"), (y, "Y")], true);
        on.source.follow_destroyed(x, y, 1).await;
        let rows = on.store.all();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].action, "unfollowed");
    }

    #[tokio::test]
    async fn test_event_after_disconnect_still_counted_on_catch_up() {
        let x = Uuid::new_v4();
        let y = Uuid::new_v4();
        let fx = fixture(&[(x, "X"), (y, "Y")], false);

        // Y was connected, then dropped
        let (conn, rx) = fx.gateway.connect(y);
        fx.gateway.subscribe(conn, &notifications_topic(y));
        fx.gateway.disconnect(conn);
        drop(rx);

        fx.source.follow_created(x, y, 1).await;

        // Give the dispatch worker a beat; no subscriber means no delivery,
        // but the REST catch-up reflects the event.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fx.gateway.subscriber_count(&notifications_topic(y)), 0);
        assert_eq!(fx.store.unread_count(y).await.unwrap(), 1);
        let rows = fx
            .store
            .list(y, 1, 20, ReadFilter::Unread)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }
}
