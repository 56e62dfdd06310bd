//! In-memory backend for unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};

use quill_api::{ApiError, ApiResult, Gateway, MemoryStorage};
use quill_types::api::LoginResponse;
use quill_types::models::{LikeEntry, Notification, NotificationKind, Post, User};
use quill_types::{NotificationId, PostId, UserId};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Login(String),
    Register(String),
    ListPosts,
    CreatePost(String),
    DeletePost(PostId),
    GetPost(PostId),
    UserPosts(String),
    ToggleLike { post_id: PostId, liked: bool },
    FetchLikers(PostId),
    UserProfile(String),
    ListNotifications(UserId),
    MarkRead(NotificationId),
    Clear(UserId),
}

#[derive(Default)]
pub struct FakeState {
    pub users: Vec<User>,
    pub posts: Vec<Post>,
    pub likes: HashMap<PostId, Vec<LikeEntry>>,
    pub notifications: Vec<Notification>,
    pub token: Option<String>,
    pub failing: HashSet<&'static str>,
    pub calls: Vec<Call>,
}

#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<FakeState>,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn fail(&self, op: &'static str) {
        self.with(|s| s.failing.insert(op));
    }

    pub fn recover(&self, op: &'static str) {
        self.with(|s| s.failing.remove(op));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.clone())
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    fn record(&self, op: &'static str, call: Call) -> ApiResult<()> {
        self.with(|s| {
            s.calls.push(call);
            if s.failing.contains(op) {
                Err(ApiError::Status { status: 500, body: format!("{} exploded", op) })
            } else {
                Ok(())
            }
        })
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn login(&self, email: &str, _password: &str) -> ApiResult<LoginResponse> {
        self.record("login", Call::Login(email.into()))?;
        self.with(|s| {
            let user = s.users.iter().find(|u| u.email == email).cloned();
            match (user, s.token.clone()) {
                (Some(user), Some(token)) => Ok(LoginResponse { message: None, token, user }),
                _ => Err(ApiError::Status { status: 403, body: "Invalid email or password".into() }),
            }
        })
    }

    async fn register(&self, username: &str, email: &str, _password: &str) -> ApiResult<()> {
        self.record("register", Call::Register(username.into()))?;
        self.with(|s| {
            let id = s.users.len() as UserId + 1;
            s.users.push(User { id, username: username.into(), email: email.into() });
        });
        Ok(())
    }

    async fn list_posts(&self) -> ApiResult<Vec<Post>> {
        self.record("list_posts", Call::ListPosts)?;
        Ok(self.with(|s| s.posts.clone()))
    }

    async fn create_post(&self, title: &str, content: &str) -> ApiResult<Post> {
        self.record("create_post", Call::CreatePost(title.into()))?;
        Ok(self.with(|s| {
            let post = Post {
                id: s.posts.iter().map(|p| p.id).max().unwrap_or(0) + 1,
                title: title.into(),
                content: content.into(),
                author_id: 1,
                author_username: "alice".into(),
                likes: Vec::new(),
            };
            s.posts.insert(0, post.clone());
            post
        }))
    }

    async fn delete_post(&self, post_id: PostId) -> ApiResult<()> {
        self.record("delete_post", Call::DeletePost(post_id))?;
        self.with(|s| s.posts.retain(|p| p.id != post_id));
        Ok(())
    }

    async fn get_post(&self, post_id: PostId) -> ApiResult<Post> {
        self.record("get_post", Call::GetPost(post_id))?;
        self.with(|s| s.posts.iter().find(|p| p.id == post_id).cloned())
            .ok_or(ApiError::Status { status: 404, body: "Post not found".into() })
    }

    async fn user_posts(&self, username: &str) -> ApiResult<Vec<Post>> {
        self.record("user_posts", Call::UserPosts(username.into()))?;
        Ok(self.with(|s| s.posts.iter().filter(|p| p.author_username == username).cloned().collect()))
    }

    async fn toggle_like(&self, post_id: PostId, user_id: UserId, liked: bool) -> ApiResult<Vec<LikeEntry>> {
        self.record("toggle_like", Call::ToggleLike { post_id, liked })?;
        // Leave room for a second click to arrive while this one is pending.
        tokio::task::yield_now().await;
        Ok(self.with(|s| {
            let username = s
                .users
                .iter()
                .find(|u| u.id == user_id)
                .map(|u| u.username.clone())
                .unwrap_or_else(|| format!("user{}", user_id));
            let likes = s.likes.entry(post_id).or_default();
            likes.retain(|l| l.id != user_id);
            if !liked {
                likes.push(LikeEntry { id: user_id, username });
            }
            likes.clone()
        }))
    }

    async fn fetch_likers(&self, post_id: PostId) -> ApiResult<Vec<LikeEntry>> {
        self.record("fetch_likers", Call::FetchLikers(post_id))?;
        Ok(self.with(|s| s.likes.get(&post_id).cloned().unwrap_or_default()))
    }

    async fn user_profile(&self, username: &str) -> ApiResult<User> {
        self.record("user_profile", Call::UserProfile(username.into()))?;
        self.with(|s| s.users.iter().find(|u| u.username == username).cloned())
            .ok_or(ApiError::Status { status: 404, body: "User not found".into() })
    }

    async fn list_notifications(&self, user_id: UserId) -> ApiResult<Vec<Notification>> {
        self.record("list_notifications", Call::ListNotifications(user_id))?;
        Ok(self.with(|s| s.notifications.clone()))
    }

    async fn mark_notification_read(&self, id: NotificationId) -> ApiResult<()> {
        self.record("mark_read", Call::MarkRead(id))?;
        self.with(|s| {
            if let Some(n) = s.notifications.iter_mut().find(|n| n.id == id) {
                n.is_read = true;
            }
        });
        Ok(())
    }

    async fn clear_notifications(&self, user_id: UserId) -> ApiResult<()> {
        self.record("clear", Call::Clear(user_id))?;
        self.with(|s| s.notifications.clear());
        Ok(())
    }
}

pub fn alice() -> User {
    User { id: 1, username: "alice".into(), email: "a@x.com".into() }
}

pub fn bob() -> User {
    User { id: 2, username: "bob".into(), email: "b@x.com".into() }
}

pub fn storage() -> Arc<MemoryStorage> {
    Arc::new(MemoryStorage::new())
}

/// HS256 token for user 1 whose `exp` is `secs` from now (negative = past).
pub fn token_expiring_in(secs: i64) -> String {
    let claims = serde_json::json!({
        "user_id": 1,
        "email": "a@x.com",
        "exp": Utc::now().timestamp() + secs,
    });
    encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test-secret")).unwrap()
}

pub fn like_notification(id: NotificationId, is_read: bool) -> Notification {
    Notification {
        id,
        kind: NotificationKind::Like,
        message: format!("User 2 liked your post {}", id * 10),
        is_read,
        created_at: Utc::now(),
        user_id: Some(1),
        post_id: Some(id * 10),
        liker_id: Some(2),
        liker_username: Some("bob".into()),
    }
}

pub fn post(id: PostId, author: &User, likes: Vec<LikeEntry>) -> Post {
    Post {
        id,
        title: format!("post {}", id),
        content: "body".into(),
        author_id: author.id,
        author_username: author.username.clone(),
        likes,
    }
}
