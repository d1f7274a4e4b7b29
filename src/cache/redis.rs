use redis::{AsyncCommands, Client, RedisError};
use tracing::info;
use uuid::Uuid;

// Redis cache key prefixes
pub const UNREAD_COUNT_KEY_PREFIX: &str = "unread_count";
const UNREAD_COUNT_TTL_SECONDS: u64 = 300; // 5 minutes

#[derive(Debug, Clone)]
pub struct RedisCache {
    client: Client,
}

impl RedisCache {
    pub fn new(client: Client) -> Self {
        // Connection validation happens on first use
        Self { client }
    }

    // Get the client
    pub fn get_client(&self) -> &Client {
        &self.client
    }

    fn unread_count_key(recipient_id: Uuid) -> String {
        format!("{}:{}", UNREAD_COUNT_KEY_PREFIX, recipient_id)
    }

    // Get a cached unread count for a recipient
    pub async fn get_unread_count(&self, recipient_id: Uuid) -> Result<Option<i64>, RedisError> {
        let mut connection = self.client.get_multiplexed_async_connection().await?;
        let key = Self::unread_count_key(recipient_id);

        let result: Option<i64> = connection.get(&key).await?;

        if result.is_some() {
            info!("Cache hit for unread count: {}", recipient_id);
        } else {
            info!("Cache miss for unread count: {}", recipient_id);
        }

        Ok(result)
    }

    // Cache an unread count for a recipient
    pub async fn set_unread_count(
        &self,
        recipient_id: Uuid,
        count: i64,
    ) -> Result<(), RedisError> {
        let key = Self::unread_count_key(recipient_id);
        self.get_client()
            .get_multiplexed_async_connection()
            .await?
            .set_ex(key, count, UNREAD_COUNT_TTL_SECONDS)
            .await
            .map(|_: ()| ())
    }

    // Invalidate a recipient's unread count after a create or mark-read
    pub async fn invalidate_unread_count(&self, recipient_id: Uuid) -> Result<(), RedisError> {
        let key = Self::unread_count_key(recipient_id);
        self.get_client()
            .get_multiplexed_async_connection()
            .await?
            .del(key)
            .await
            .map(|_: ()| ())
    }
}
