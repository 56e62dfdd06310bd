//! Page-level state for the feed, profile and single-post pages.

use std::sync::Arc;

use tracing::{error, info, warn};

use quill_api::Gateway;
use quill_types::models::{LikeEntry, Post, User};
use quill_types::PostId;

use crate::error::{ClientError, ClientResult};
use crate::session::Session;

const FIELDS_REQUIRED: &str = "Both fields are required!";
const NOT_YOUR_POST: &str = "You can only delete your own posts.";

fn apply_likes(posts: &mut [Post], post_id: PostId, likes: &[LikeEntry]) -> bool {
    match posts.iter_mut().find(|p| p.id == post_id) {
        Some(post) => {
            post.likes = likes.to_vec();
            true
        }
        None => false,
    }
}

pub struct Feed<G: Gateway> {
    gateway: Arc<G>,
    posts: Vec<Post>,
    error: Option<&'static str>,
}

impl<G: Gateway> Feed<G> {
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            posts: Vec::new(),
            error: None,
        }
    }

    pub async fn load(&mut self) -> ClientResult<()> {
        match self.gateway.list_posts().await {
            Ok(posts) => {
                self.posts = posts;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                error!("Failed to load posts: {}", e);
                self.error = Some(e.user_message());
                Err(e.into())
            }
        }
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn find(&self, post_id: PostId) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    /// Inline error from the last failed action, if any.
    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    /// Both fields must be non-blank; nothing is sent otherwise. Accepted text
    /// is sent as typed.
    pub async fn create_post(&mut self, title: &str, content: &str) -> ClientResult<&Post> {
        if title.trim().is_empty() || content.trim().is_empty() {
            self.error = Some(FIELDS_REQUIRED);
            return Err(ClientError::Validation(FIELDS_REQUIRED));
        }

        let post = self.gateway.create_post(title, content).await.map_err(|e| {
            error!("Failed to create post: {}", e);
            self.error = Some(e.user_message());
            e
        })?;

        info!(post_id = post.id, "Created post");
        self.error = None;
        self.posts.insert(0, post);
        Ok(&self.posts[0])
    }

    /// Adopt a liker set reported by a like control.
    pub fn apply_likes(&mut self, post_id: PostId, likes: &[LikeEntry]) -> bool {
        apply_likes(&mut self.posts, post_id, likes)
    }
}

pub struct ProfileView<G: Gateway> {
    gateway: Arc<G>,
    profile: User,
    posts: Vec<Post>,
    own: bool,
}

impl<G: Gateway> ProfileView<G> {
    /// Load a profile and its posts. `None` loads the viewer's own profile.
    pub async fn load(gateway: Arc<G>, session: &Session, username: Option<&str>) -> ClientResult<Self> {
        let viewer = session.user.as_ref().filter(|_| session.is_authenticated);
        let username = match (username, viewer) {
            (Some(name), _) => name.to_string(),
            (None, Some(me)) => me.username.clone(),
            (None, None) => return Err(ClientError::NotAuthenticated),
        };

        let profile = gateway.user_profile(&username).await.map_err(|e| {
            error!(%username, "Failed to load profile: {}", e);
            e
        })?;
        let posts = gateway.user_posts(&username).await.map_err(|e| {
            error!(%username, "Failed to load posts for profile: {}", e);
            e
        })?;

        let own = viewer.is_some_and(|me| me.id == profile.id);
        Ok(Self {
            gateway,
            profile,
            posts,
            own,
        })
    }

    pub fn profile(&self) -> &User {
        &self.profile
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn is_own_profile(&self) -> bool {
        self.own
    }

    /// Removed locally only once the server confirms.
    pub async fn delete_post(&mut self, post_id: PostId) -> ClientResult<()> {
        if !self.own {
            return Err(ClientError::Validation(NOT_YOUR_POST));
        }

        self.gateway.delete_post(post_id).await.map_err(|e| {
            error!(post_id, "Failed to delete post: {}", e);
            e
        })?;

        info!(post_id, "Deleted post");
        self.posts.retain(|p| p.id != post_id);
        Ok(())
    }

    pub fn apply_likes(&mut self, post_id: PostId, likes: &[LikeEntry]) -> bool {
        apply_likes(&mut self.posts, post_id, likes)
    }
}

pub struct PostPage {
    post: Option<Post>,
}

impl PostPage {
    /// Any load failure renders as "not found".
    pub async fn load<G: Gateway>(gateway: &G, post_id: PostId) -> Self {
        let post = match gateway.get_post(post_id).await {
            Ok(post) => Some(post),
            Err(e) => {
                warn!(post_id, "Failed to load post: {}", e);
                None
            }
        };
        Self { post }
    }

    pub fn post(&self) -> Option<&Post> {
        self.post.as_ref()
    }

    pub fn is_not_found(&self) -> bool {
        self.post.is_none()
    }

    pub fn apply_likes(&mut self, likes: &[LikeEntry]) {
        if let Some(post) = self.post.as_mut() {
            post.likes = likes.to_vec();
        }
    }
}
