use uuid::Uuid;

/// Per-recipient notification stream
pub fn notifications_topic(user_id: Uuid) -> String {
    format!("notifications:{}", user_id)
}

/// Per-recipient feed stream (new posts, reaction counts, shares)
pub fn feed_topic(user_id: Uuid) -> String {
    format!("feed:{}", user_id)
}
