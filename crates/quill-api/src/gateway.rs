//! The backend as the client sees it.
//!
//! Every call except `login`/`register` needs a stored bearer token and fails
//! with [`ApiError::MissingToken`](crate::ApiError::MissingToken) before
//! touching the network when there is none.

use async_trait::async_trait;

use quill_types::api::LoginResponse;
use quill_types::models::{LikeEntry, Notification, Post, User};
use quill_types::{NotificationId, PostId, UserId};

use crate::error::ApiResult;

#[async_trait]
pub trait Gateway: Send + Sync {
    // --- Auth ---
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse>;

    async fn register(&self, username: &str, email: &str, password: &str) -> ApiResult<()>;

    // --- Posts ---
    async fn list_posts(&self) -> ApiResult<Vec<Post>>;

    async fn create_post(&self, title: &str, content: &str) -> ApiResult<Post>;

    async fn delete_post(&self, post_id: PostId) -> ApiResult<()>;

    async fn get_post(&self, post_id: PostId) -> ApiResult<Post>;

    async fn user_posts(&self, username: &str) -> ApiResult<Vec<Post>>;

    // --- Likes ---

    /// `liked` is the state *before* the toggle: `true` sends an unlike.
    /// Returns the authoritative liker set after the mutation.
    async fn toggle_like(&self, post_id: PostId, user_id: UserId, liked: bool) -> ApiResult<Vec<LikeEntry>>;

    async fn fetch_likers(&self, post_id: PostId) -> ApiResult<Vec<LikeEntry>>;

    // --- Users ---
    async fn user_profile(&self, username: &str) -> ApiResult<User>;

    // --- Notifications ---
    async fn list_notifications(&self, user_id: UserId) -> ApiResult<Vec<Notification>>;

    /// Idempotent on the server.
    async fn mark_notification_read(&self, id: NotificationId) -> ApiResult<()>;

    async fn clear_notifications(&self, user_id: UserId) -> ApiResult<()>;
}
