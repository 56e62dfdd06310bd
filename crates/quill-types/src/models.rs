use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::{NotificationId, PostId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

/// One entry of a post's liker set. Entries are unique by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeEntry {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub content: String,
    pub author_id: UserId,
    #[serde(default)]
    pub author_username: String,
    /// Cached liker set; only as fresh as the last fetch or toggle.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub likes: Vec<LikeEntry>,
}

impl Post {
    pub fn is_liked_by(&self, user_id: UserId) -> bool {
        contains_liker(&self.likes, user_id)
    }
}

/// Membership test used everywhere a liked/unliked state is derived.
pub fn contains_liker(likes: &[LikeEntry], user_id: UserId) -> bool {
    likes.iter().any(|like| like.id == user_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub user_id: Option<UserId>,
    #[serde(default)]
    pub post_id: Option<PostId>,
    #[serde(default)]
    pub liker_id: Option<UserId>,
    #[serde(default)]
    pub liker_username: Option<String>,
}

impl Notification {
    /// Text shown in the dropdown. Likes are rendered from the liker's name,
    /// everything else falls back to the server-provided message.
    pub fn display_text(&self) -> String {
        match (self.kind, self.liker_username.as_deref()) {
            (NotificationKind::Like, Some(liker)) => format!("{} liked your post", liker),
            _ => self.message.clone(),
        }
    }
}

/// The posts backend encodes an empty slice as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}
