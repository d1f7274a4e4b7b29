use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kinds of domain write that are notification-worthy.
///
/// `NewPost` is feed-only: it fans out to follower feeds but never produces
/// a notification row. `Shared` is stored as `share` on the wire and in the
/// notifications table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Liked,
    Commented,
    Mentioned,
    Followed,
    Unfollowed,
    #[serde(rename = "share")]
    Shared,
    Reacted,
    NewPost,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Liked => "liked",
            EventKind::Commented => "commented",
            EventKind::Mentioned => "mentioned",
            EventKind::Followed => "followed",
            EventKind::Unfollowed => "unfollowed",
            EventKind::Shared => "share",
            EventKind::Reacted => "reacted",
            EventKind::NewPost => "new_post",
        }
    }

    pub fn from_action(action: &str) -> Option<Self> {
        match action {
            "liked" => Some(EventKind::Liked),
            "commented" => Some(EventKind::Commented),
            "mentioned" => Some(EventKind::Mentioned),
            "followed" => Some(EventKind::Followed),
            "unfollowed" => Some(EventKind::Unfollowed),
            "share" | "shared" => Some(EventKind::Shared),
            "reacted" => Some(EventKind::Reacted),
            "new_post" => Some(EventKind::NewPost),
            _ => None,
        }
    }
}

/// The entity kinds a notification can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectKind {
    Micropost,
    Comment,
    Reaction,
    Follow,
    Share,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Micropost => "micropost",
            SubjectKind::Comment => "comment",
            SubjectKind::Reaction => "reaction",
            SubjectKind::Follow => "follow",
            SubjectKind::Share => "share",
        }
    }

    pub fn from_str(kind: &str) -> Option<Self> {
        match kind {
            "micropost" => Some(SubjectKind::Micropost),
            "comment" => Some(SubjectKind::Comment),
            "reaction" => Some(SubjectKind::Reaction),
            "follow" => Some(SubjectKind::Follow),
            "share" => Some(SubjectKind::Share),
            _ => None,
        }
    }
}

/// Tagged reference to the entity an event is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRef {
    #[serde(rename = "type")]
    pub kind: SubjectKind,
    pub id: i64,
}

impl SubjectRef {
    pub fn new(kind: SubjectKind, id: i64) -> Self {
        Self { kind, id }
    }
}

/// An ephemeral record of a notification-worthy write. Built at commit
/// time, consumed by the topic router, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub kind: EventKind,
    pub actor_id: Uuid,
    pub subject: SubjectRef,
    pub occurred_at: DateTime<Utc>,
}

impl DomainEvent {
    pub fn new(kind: EventKind, actor_id: Uuid, subject: SubjectRef) -> Self {
        Self {
            kind,
            actor_id,
            subject,
            occurred_at: Utc::now(),
        }
    }
}
