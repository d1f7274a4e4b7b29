use async_trait::async_trait;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::event::model::SubjectRef;
use crate::notification::model::{
    Notification, NotificationError, NotificationWithActor, ReadFilter,
};

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

/// Durable storage for notifications.
///
/// Creation never deduplicates; suppression is the event source's job.
/// Mutation is restricted to the read flag, scoped to the owning recipient.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn create(
        &self,
        recipient_id: Uuid,
        actor_id: Uuid,
        action: &str,
        notifiable: SubjectRef,
    ) -> Result<Notification, NotificationError>;

    async fn list(
        &self,
        recipient_id: Uuid,
        page: i64,
        page_size: i64,
        filter: ReadFilter,
    ) -> Result<Vec<NotificationWithActor>, NotificationError>;

    async fn unread_count(&self, recipient_id: Uuid) -> Result<i64, NotificationError>;

    async fn mark_as_read(
        &self,
        notification_id: i64,
        recipient_id: Uuid,
    ) -> Result<Notification, NotificationError>;

    async fn mark_all_as_read(&self, recipient_id: Uuid) -> Result<u64, NotificationError>;
}

/// Postgres-backed notification store
#[derive(Debug, Clone)]
pub struct PgNotificationStore {
    pool: PgPool,
}

impl PgNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub fn clamp_page(page: i64) -> i64 {
    page.max(1)
}

pub fn clamp_page_size(page_size: i64) -> i64 {
    page_size.clamp(1, MAX_PAGE_SIZE)
}

pub fn default_page_size() -> i64 {
    DEFAULT_PAGE_SIZE
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23503"),
        _ => false,
    }
}

#[async_trait]
impl NotificationStore for PgNotificationStore {
    async fn create(
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

        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO global.notifications (recipient_id, actor_id, action, notifiable_type, notifiable_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(recipient_id)
        .bind(actor_id)
        .bind(action)
        .bind(notifiable.kind.as_str())
        .bind(notifiable.id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                NotificationError::ValidationFailed(
                    "recipient or actor does not exist".to_string(),
                )
            } else {
                NotificationError::DatabaseError(e)
            }
        })?;

        info!(
            "Created notification {} for recipient {} ({})",
            notification.id, recipient_id, action
        );
        Ok(notification)
    }

    async fn list(
        &self,
        recipient_id: Uuid,
        page: i64,
        page_size: i64,
        filter: ReadFilter,
    ) -> Result<Vec<NotificationWithActor>, NotificationError> {
        let page = clamp_page(page);
        let page_size = clamp_page_size(page_size);
        let offset = (page - 1) * page_size;

        let read_clause = match filter {
            ReadFilter::Read => "AND n.read = TRUE",
            ReadFilter::Unread => "AND n.read = FALSE",
            ReadFilter::All => "",
        };

        let query = format!(
            r#"
            SELECT n.id, n.recipient_id, n.actor_id, n.action,
                   n.notifiable_type, n.notifiable_id, n.read, n.created_at,
                   u.name AS actor_name, u.avatar_url AS actor_avatar_url
            FROM global.notifications n
            JOIN global.users u ON u.id = n.actor_id
            WHERE n.recipient_id = $1 {}
            ORDER BY n.created_at DESC, n.id DESC
            LIMIT $2 OFFSET $3
            "#,
            read_clause
        );

        let rows = sqlx::query_as::<_, NotificationWithActor>(&query)
            .bind(recipient_id)
            .bind(page_size)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn unread_count(&self, recipient_id: Uuid) -> Result<i64, NotificationError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM global.notifications WHERE recipient_id = $1 AND read = FALSE",
        )
        .bind(recipient_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn mark_as_read(
        &self,
        notification_id: i64,
        recipient_id: Uuid,
    ) -> Result<Notification, NotificationError> {
        // The recipient check lives in the WHERE clause so a foreign
        // notification id is indistinguishable from a missing one.
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE global.notifications
            SET read = TRUE
            WHERE id = $1 AND recipient_id = $2
            RETURNING *
            "#,
        )
        .bind(notification_id)
        .bind(recipient_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(NotificationError::NotFound)?;

        Ok(notification)
    }

    async fn mark_all_as_read(&self, recipient_id: Uuid) -> Result<u64, NotificationError> {
        let result = sqlx::query(
            "UPDATE global.notifications SET read = TRUE WHERE recipient_id = $1 AND read = FALSE",
        )
        .bind(recipient_id)
        .execute(&self.pool)
        .await?;

        info!(
            "Marked {} notifications as read for recipient {}",
            result.rows_affected(),
            recipient_id
        );
        Ok(result.rows_affected())
    }
}

/// In-memory store used by unit tests across the crate.
#[cfg(test)]
pub mod testing {
    use super::*;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct InMemoryNotificationStore {
        state: Mutex<InMemoryState>,
    }

    #[derive(Default)]
    struct InMemoryState {
        next_id: i64,
        rows: Vec<Notification>,
        actor_names: HashMap<Uuid, String>,
    }

    impl InMemoryNotificationStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_actor(self, id: Uuid, name: &str) -> Self {
            self.state
                .lock()
                .unwrap()
                .actor_names
                .insert(id, name.to_string());
            self
        }

        pub fn all(&self) -> Vec<Notification> {
            self.state.lock().unwrap().rows.clone()
        }
    }

    #[async_trait]
    impl NotificationStore for InMemoryNotificationStore {
        async fn create(
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

            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let notification = Notification {
                id: state.next_id,
                recipient_id,
                actor_id,
                action: action.to_string(),
                notifiable_type: notifiable.kind.as_str().to_string(),
                notifiable_id: notifiable.id,
                read: false,
                created_at: Utc::now(),
            };
            state.rows.push(notification.clone());
            Ok(notification)
        }

        async fn list(
            &self,
            recipient_id: Uuid,
            page: i64,
            page_size: i64,
            filter: ReadFilter,
        ) -> Result<Vec<NotificationWithActor>, NotificationError> {
            let page = clamp_page(page);
            let page_size = clamp_page_size(page_size);
            let state = self.state.lock().unwrap();

            let mut rows: Vec<&Notification> = state
                .rows
                .iter()
                .filter(|n| n.recipient_id == recipient_id)
                .filter(|n| match filter {
                    ReadFilter::Read => n.read,
                    ReadFilter::Unread => !n.read,
                    ReadFilter::All => true,
                })
                .collect();
            rows.sort_by(|a, b| b.id.cmp(&a.id));

            Ok(rows
                .into_iter()
                .skip(((page - 1) * page_size) as usize)
                .take(page_size as usize)
                .map(|n| NotificationWithActor {
                    id: n.id,
                    recipient_id: n.recipient_id,
                    actor_id: n.actor_id,
                    action: n.action.clone(),
                    notifiable_type: n.notifiable_type.clone(),
                    notifiable_id: n.notifiable_id,
                    read: n.read,
                    created_at: n.created_at,
                    actor_name: state
                        .actor_names
                        .get(&n.actor_id)
                        .cloned()
                        .unwrap_or_else(|| "unknown".to_string()),
                    actor_avatar_url: None,
                })
                .collect())
        }

        async fn unread_count(&self, recipient_id: Uuid) -> Result<i64, NotificationError> {
            let state = self.state.lock().unwrap();
            Ok(state
                .rows
                .iter()
                .filter(|n| n.recipient_id == recipient_id && !n.read)
                .count() as i64)
        }

        async fn mark_as_read(
            &self,
            notification_id: i64,
            recipient_id: Uuid,
        ) -> Result<Notification, NotificationError> {
            let mut state = self.state.lock().unwrap();
            let row = state
                .rows
                .iter_mut()
                .find(|n| n.id == notification_id && n.recipient_id == recipient_id)
                .ok_or(NotificationError::NotFound)?;
            row.read = true;
            Ok(row.clone())
        }

        async fn mark_all_as_read(&self, recipient_id: Uuid) -> Result<u64, NotificationError> {
            let mut state = self.state.lock().unwrap();
            let mut updated = 0;
            for row in state
                .rows
                .iter_mut()
                .filter(|n| n.recipient_id == recipient_id && !n.read)
            {
                row.read = true;
                updated += 1;
            }
            Ok(updated)
        }
    }
}
