use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use quill_types::api::{CreatePostRequest, LikeRequest, LoginRequest, LoginResponse, RegisterRequest};
use quill_types::models::{LikeEntry, Notification, Post, User};
use quill_types::{NotificationId, PostId, UserId};

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use crate::gateway::Gateway;
use crate::storage::{Storage, TOKEN_KEY};

const AUTH_API: [&str; 2] = ["api", "auth"];
const POSTS_API: [&str; 2] = ["api", "posts"];
const USERS_API: [&str; 3] = ["api", "users", "api"];
const NOTIFICATIONS_API: [&str; 2] = ["api", "notifications"];

/// [`Gateway`] over the REST backend. The bearer token is read from the shared
/// storage on every call, so a login persisted by the session is picked up
/// without rebuilding the gateway.
pub struct HttpGateway {
    client: Client,
    base: Url,
    storage: Arc<dyn Storage>,
}

impl HttpGateway {
    pub fn new(config: &ClientConfig, storage: Arc<dyn Storage>) -> ApiResult<Self> {
        let base = Url::parse(&config.api_url).map_err(|e| ApiError::BaseUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(ApiError::BaseUrl(config.api_url.clone()));
        }

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self { client, base, storage })
    }

    fn url(&self, prefix: &[&str], rest: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in `new`: the base can always carry path segments.
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(prefix).extend(rest);
        }
        url
    }

    fn bearer(&self) -> ApiResult<String> {
        match self.storage.get(TOKEN_KEY)? {
            Some(token) if !token.is_empty() => Ok(token),
            _ => Err(ApiError::MissingToken),
        }
    }

    fn authed(&self, method: Method, url: Url) -> ApiResult<RequestBuilder> {
        let token = self.bearer()?;
        debug!("{} {}", method, url);
        Ok(self.client.request(method, url).bearer_auth(token))
    }
}

async fn send(endpoint: &'static str, req: RequestBuilder) -> ApiResult<Response> {
    let resp = req.send().await.map_err(|e| {
        warn!(endpoint, "request failed: {}", e);
        ApiError::Transport(e)
    })?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        warn!(endpoint, status = status.as_u16(), "request rejected");
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: body.trim().to_string(),
        });
    }

    Ok(resp)
}

async fn read_json<T: DeserializeOwned>(endpoint: &'static str, resp: Response) -> ApiResult<T> {
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::MalformedResponse {
        endpoint,
        detail: e.to_string(),
    })
}

/// Decode an endpoint that must answer with an array. `null` or an empty body
/// mean "no items"; any other shape is a protocol violation.
async fn read_collection<T: DeserializeOwned>(endpoint: &'static str, resp: Response) -> ApiResult<Vec<T>> {
    let bytes = resp.bytes().await?;
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }

    let malformed = |detail: String| ApiError::MalformedResponse { endpoint, detail };
    let value: Value = serde_json::from_slice(&bytes).map_err(|e| malformed(e.to_string()))?;

    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => serde_json::from_value(value).map_err(|e| malformed(e.to_string())),
        other => Err(malformed(format!("expected an array, got {}", json_kind(&other)))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn login(&self, email: &str, password: &str) -> ApiResult<LoginResponse> {
        const EP: &str = "POST /api/auth/login";
        let body = LoginRequest { email: email.into(), password: password.into() };
        let req = self.client.post(self.url(&AUTH_API, &["login"])).json(&body);
        read_json(EP, send(EP, req).await?).await
    }

    async fn register(&self, username: &str, email: &str, password: &str) -> ApiResult<()> {
        const EP: &str = "POST /api/auth/register";
        let body = RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        };
        let req = self.client.post(self.url(&AUTH_API, &["register"])).json(&body);
        send(EP, req).await?;
        Ok(())
    }

    async fn list_posts(&self) -> ApiResult<Vec<Post>> {
        const EP: &str = "GET /api/posts/posts";
        let req = self.authed(Method::GET, self.url(&POSTS_API, &["posts"]))?;
        read_collection(EP, send(EP, req).await?).await
    }

    async fn create_post(&self, title: &str, content: &str) -> ApiResult<Post> {
        const EP: &str = "POST /api/posts/posts";
        let body = CreatePostRequest { title: title.into(), content: content.into() };
        let req = self.authed(Method::POST, self.url(&POSTS_API, &["posts"]))?.json(&body);
        read_json(EP, send(EP, req).await?).await
    }

    async fn delete_post(&self, post_id: PostId) -> ApiResult<()> {
        const EP: &str = "DELETE /api/posts/posts/{id}";
        let id = post_id.to_string();
        let req = self.authed(Method::DELETE, self.url(&POSTS_API, &["posts", id.as_str()]))?;
        send(EP, req).await?;
        Ok(())
    }

    async fn get_post(&self, post_id: PostId) -> ApiResult<Post> {
        const EP: &str = "GET /api/posts/posts/{id}";
        let id = post_id.to_string();
        let req = self.authed(Method::GET, self.url(&POSTS_API, &["posts", id.as_str()]))?;
        read_json(EP, send(EP, req).await?).await
    }

    async fn user_posts(&self, username: &str) -> ApiResult<Vec<Post>> {
        const EP: &str = "GET /api/posts/profile/{username}/posts";
        let req = self.authed(Method::GET, self.url(&POSTS_API, &["profile", username, "posts"]))?;
        read_collection(EP, send(EP, req).await?).await
    }

    async fn toggle_like(&self, post_id: PostId, user_id: UserId, liked: bool) -> ApiResult<Vec<LikeEntry>> {
        const EP: &str = "POST|DELETE /api/posts/likes";
        let method = if liked { Method::DELETE } else { Method::POST };
        let body = LikeRequest { post_id, user_id };
        let req = self.authed(method, self.url(&POSTS_API, &["likes"]))?.json(&body);
        read_collection(EP, send(EP, req).await?).await
    }

    async fn fetch_likers(&self, post_id: PostId) -> ApiResult<Vec<LikeEntry>> {
        const EP: &str = "GET /api/posts/likes";
        let req = self
            .authed(Method::GET, self.url(&POSTS_API, &["likes"]))?
            .query(&[("postId", post_id)]);
        read_collection(EP, send(EP, req).await?).await
    }

    async fn user_profile(&self, username: &str) -> ApiResult<User> {
        const EP: &str = "GET /api/users/api/users/by_username";
        let req = self
            .authed(Method::GET, self.url(&USERS_API, &["users", "by_username"]))?
            .query(&[("username", username)]);
        read_json(EP, send(EP, req).await?).await
    }

    async fn list_notifications(&self, user_id: UserId) -> ApiResult<Vec<Notification>> {
        const EP: &str = "GET /api/notifications/notifications";
        let req = self
            .authed(Method::GET, self.url(&NOTIFICATIONS_API, &["notifications"]))?
            .query(&[("userId", user_id)]);
        read_collection(EP, send(EP, req).await?).await
    }

    async fn mark_notification_read(&self, id: NotificationId) -> ApiResult<()> {
        const EP: &str = "PATCH /api/notifications/notifications/read";
        let req = self
            .authed(Method::PATCH, self.url(&NOTIFICATIONS_API, &["notifications", "read"]))?
            .query(&[("id", id)]);
        send(EP, req).await?;
        Ok(())
    }

    async fn clear_notifications(&self, user_id: UserId) -> ApiResult<()> {
        const EP: &str = "DELETE /api/notifications/notifications/{userId}/clear";
        let uid = user_id.to_string();
        let req = self.authed(
            Method::DELETE,
            self.url(&NOTIFICATIONS_API, &["notifications", uid.as_str(), "clear"]),
        )?;
        send(EP, req).await?;
        Ok(())
    }
}
