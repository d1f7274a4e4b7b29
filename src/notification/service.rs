use std::sync::Arc;

use tracing::{error, info};
use uuid::Uuid;

use crate::cache::redis::RedisCache;
use crate::event::model::{DomainEvent, EventKind, SubjectRef};
use crate::notification::model::{
    Notification, NotificationError, NotificationResponse, ReadFilter,
};
use crate::notification::store::NotificationStore;
use crate::realtime::dispatcher::{BroadcastDispatcher, DispatchJob};

/// Orchestrates the notification pipeline: synchronous persistence first,
/// then a fire-and-forget dispatch. The REST surface stays correct even if
/// no dispatch ever goes out.
#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    dispatcher: BroadcastDispatcher,
    redis_cache: Option<RedisCache>,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        dispatcher: BroadcastDispatcher,
        redis_cache: Option<RedisCache>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            redis_cache,
        }
    }

    /// Inbound boundary for event-source collaborators. Accepts the action
    /// as a raw string, normalizing known kinds to their stored form
    /// ("shared" is stored as "share").
    pub async fn notify(
        &self,
        recipient_id: Uuid,
        actor_id: Uuid,
        action: &str,
        notifiable: SubjectRef,
    ) -> Result<Notification, NotificationError> {
        if action.trim().is_empty() {
            return Err(NotificationError::ValidationFailed(
                "action must not be blank".to_string(),
            ));
        }
        let action = match EventKind::from_action(action) {
            Some(kind) => kind.as_str(),
            None => action,
        };

        let notification = self
            .store
            .create(recipient_id, actor_id, action, notifiable)
            .await?;

        self.invalidate_unread_count(recipient_id).await;
        self.dispatcher
            .enqueue(DispatchJob::Notification(notification.clone()));

        Ok(notification)
    }

    /// Typed path used by the event source.
    pub async fn notify_event(
        &self,
        recipient_id: Uuid,
        actor_id: Uuid,
        kind: EventKind,
        notifiable: SubjectRef,
    ) -> Result<Notification, NotificationError> {
        self.notify(recipient_id, actor_id, kind.as_str(), notifiable)
            .await
    }

    /// Queue a feed-only event (no notification row) for broadcast.
    pub fn publish_feed_event(&self, event: DomainEvent) {
        self.dispatcher.enqueue(DispatchJob::Feed(event));
    }

    pub async fn list(
        &self,
        recipient_id: Uuid,
        page: i64,
        page_size: i64,
        filter: ReadFilter,
    ) -> Result<(Vec<NotificationResponse>, i64), NotificationError> {
        let rows = self
            .store
            .list(recipient_id, page, page_size, filter)
            .await?;
        let unread_count = self.unread_count(recipient_id).await?;

        Ok((
            rows.into_iter().map(NotificationResponse::from).collect(),
            unread_count,
        ))
    }

    pub async fn unread_count(&self, recipient_id: Uuid) -> Result<i64, NotificationError> {
        if let Some(cache) = &self.redis_cache {
            match cache.get_unread_count(recipient_id).await {
                Ok(Some(count)) => return Ok(count),
                Ok(None) => {}
                Err(e) => error!("Failed to read unread count cache: {}", e),
            }
        }

        let count = self.store.unread_count(recipient_id).await?;

        if let Some(cache) = &self.redis_cache {
            if let Err(e) = cache.set_unread_count(recipient_id, count).await {
                error!("Failed to cache unread count: {}", e);
            }
        }

        Ok(count)
    }

    pub async fn mark_as_read(
        &self,
        notification_id: i64,
        recipient_id: Uuid,
    ) -> Result<Notification, NotificationError> {
        let notification = self
            .store
            .mark_as_read(notification_id, recipient_id)
            .await?;
        self.invalidate_unread_count(recipient_id).await;

        info!(
            "Marked notification {} as read for recipient {}",
            notification_id, recipient_id
        );
        Ok(notification)
    }

    pub async fn mark_all_as_read(&self, recipient_id: Uuid) -> Result<u64, NotificationError> {
        let updated = self.store.mark_all_as_read(recipient_id).await?;
        self.invalidate_unread_count(recipient_id).await;
        Ok(updated)
    }

    // Cache failures are logged and swallowed; the store remains the
    // source of truth.
    async fn invalidate_unread_count(&self, recipient_id: Uuid) {
        if let Some(cache) = &self.redis_cache {
            if let Err(e) = cache.invalidate_unread_count(recipient_id).await {
                error!("Failed to invalidate unread count cache: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::model::SubjectKind;
    use crate::realtime::gateway::RealtimeGateway;
    use crate::realtime::router::{RouteJobs, RouterError};
    use async_trait::async_trait;

    struct FailingRouter;

    #[async_trait]
    impl RouteJobs for FailingRouter {
        async fn route(
            &self,
            _job: &DispatchJob,
        ) -> Result<Vec<(String, serde_json::Value)>, RouterError> {
            let err = serde_json::from_str::<i64>("not a number").unwrap_err();
            Err(RouterError::SerializationError(err))
        }
    }

    fn service_with_broken_delivery() -> NotificationService {
        let gateway = Arc::new(RealtimeGateway::new(8));
        let dispatcher = BroadcastDispatcher::start(Arc::new(FailingRouter), gateway, 16);
        NotificationService::new(
            Arc::new(crate::notification::store::testing::InMemoryNotificationStore::new()),
            dispatcher,
            None,
        )
    }

    #[tokio::test]
    async fn test_persistence_is_independent_of_delivery() {
        // Every dispatch fails to route, yet rows land and are queryable.
        let service = service_with_broken_delivery();
        let recipient = Uuid::new_v4();

        for i in 0..3 {
            service
                .notify(
                    recipient,
                    Uuid::new_v4(),
                    "liked",
                    SubjectRef::new(SubjectKind::Micropost, i),
                )
                .await
                .unwrap();
        }

        assert_eq!(service.unread_count(recipient).await.unwrap(), 3);
        let (notifications, unread) = service
            .list(recipient, 1, 20, ReadFilter::All)
            .await
            .unwrap();
        assert_eq!(notifications.len(), 3);
        assert_eq!(unread, 3);
    }

    #[tokio::test]
    async fn test_store_error_propagates_to_notify_caller() {
        use crate::notification::store::MockNotificationStore;

        let mut store = MockNotificationStore::new();
        store.expect_create().returning(|_, _, _, _| {
            Err(NotificationError::ValidationFailed(
                "recipient or actor does not exist".to_string(),
            ))
        });

        let gateway = Arc::new(RealtimeGateway::new(8));
        let dispatcher = BroadcastDispatcher::start(Arc::new(FailingRouter), gateway, 16);
        let service = NotificationService::new(Arc::new(store), dispatcher, None);

        let result = service
            .notify(
                Uuid::new_v4(),
                Uuid::new_v4(),
                "followed",
                SubjectRef::new(SubjectKind::Follow, 1),
            )
            .await;
        assert!(matches!(
            result,
            Err(NotificationError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_notify_rejects_blank_action() {
        let service = service_with_broken_delivery();
        let result = service
            .notify(
                Uuid::new_v4(),
                Uuid::new_v4(),
                "",
                SubjectRef::new(SubjectKind::Follow, 1),
            )
            .await;
        assert!(matches!(
            result,
            Err(NotificationError::ValidationFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_notify_normalizes_share_action() {
        let service = service_with_broken_delivery();
        let notification = service
            .notify(
                Uuid::new_v4(),
                Uuid::new_v4(),
                "shared",
                SubjectRef::new(SubjectKind::Share, 1),
            )
            .await
            .unwrap();
        assert_eq!(notification.action, "share");
    }

    #[tokio::test]
    async fn test_mark_one_then_list_reports_remaining_unread() {
        let service = service_with_broken_delivery();
        let recipient = Uuid::new_v4();

        let mut ids = Vec::new();
        for i in 0..5 {
            let n = service
                .notify(
                    recipient,
                    Uuid::new_v4(),
                    "followed",
                    SubjectRef::new(SubjectKind::Follow, i),
                )
                .await
                .unwrap();
            ids.push(n.id);
        }

        service.mark_as_read(ids[0], recipient).await.unwrap();

        let (notifications, unread) = service
            .list(recipient, 1, 20, ReadFilter::All)
            .await
            .unwrap();
        assert_eq!(unread, 4);
        let read_one = notifications.iter().find(|n| n.id == ids[0]).unwrap();
        assert!(read_one.read);
        assert_eq!(notifications.iter().filter(|n| !n.read).count(), 4);
    }

    #[tokio::test]
    async fn test_mark_as_read_rejects_foreign_recipient() {
        let service = service_with_broken_delivery();
        let owner = Uuid::new_v4();
        let n = service
            .notify(
                owner,
                Uuid::new_v4(),
                "commented",
                SubjectRef::new(SubjectKind::Comment, 1),
            )
            .await
            .unwrap();

        assert!(matches!(
            service.mark_as_read(n.id, Uuid::new_v4()).await,
            Err(NotificationError::NotFound)
        ));
        assert_eq!(service.unread_count(owner).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_mark_all_as_read_zeroes_the_count() {
        let service = service_with_broken_delivery();
        let recipient = Uuid::new_v4();
        for i in 0..4 {
            service
                .notify(
                    recipient,
                    Uuid::new_v4(),
                    "mentioned",
                    SubjectRef::new(SubjectKind::Micropost, i),
                )
                .await
                .unwrap();
        }

        let updated = service.mark_all_as_read(recipient).await.unwrap();
        assert_eq!(updated, 4);
        assert_eq!(service.unread_count(recipient).await.unwrap(), 0);
    }
}
