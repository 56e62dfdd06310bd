use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use quill_api::Gateway;
use quill_types::models::{LikeEntry, Post, contains_liker};
use quill_types::{PostId, UserId};

use crate::error::{ClientError, ClientResult};

pub const DEFAULT_TOOLTIP_DELAY: Duration = Duration::from_millis(500);

/// Called with the server's liker set after every successful toggle so the
/// owning post can replace its cached copy.
pub type LikeCallback = Arc<dyn Fn(PostId, &[LikeEntry]) + Send + Sync>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub likes: Vec<LikeEntry>,
    pub tooltip_visible: bool,
    pub tooltip_data: Vec<LikeEntry>,
}

struct Shared {
    state: Mutex<LikeState>,
    toggling: AtomicBool,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, LikeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight flag when the toggle finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Like button for one post: toggle plus a hover tooltip listing likers.
///
/// The tooltip fetch runs on a spawned task, so `pointer_enter` must be called
/// inside a tokio runtime. The task is aborted on leave, on re-enter and when
/// the control is dropped.
pub struct LikeControl<G: Gateway + 'static> {
    gateway: Arc<G>,
    post_id: PostId,
    current_user: UserId,
    shared: Arc<Shared>,
    hover: Option<JoinHandle<()>>,
    tooltip_delay: Duration,
    on_change: Option<LikeCallback>,
}

impl<G: Gateway + 'static> LikeControl<G> {
    pub fn new(gateway: Arc<G>, post_id: PostId, current_user: UserId, likes: Vec<LikeEntry>) -> Self {
        let state = LikeState {
            liked: contains_liker(&likes, current_user),
            tooltip_data: likes.clone(),
            likes,
            tooltip_visible: false,
        };

        Self {
            gateway,
            post_id,
            current_user,
            shared: Arc::new(Shared {
                state: Mutex::new(state),
                toggling: AtomicBool::new(false),
            }),
            hover: None,
            tooltip_delay: DEFAULT_TOOLTIP_DELAY,
            on_change: None,
        }
    }

    pub fn for_post(gateway: Arc<G>, post: &Post, current_user: UserId) -> Self {
        Self::new(gateway, post.id, current_user, post.likes.clone())
    }

    pub fn with_tooltip_delay(mut self, delay: Duration) -> Self {
        self.tooltip_delay = delay;
        self
    }

    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(PostId, &[LikeEntry]) + Send + Sync + 'static,
    {
        self.on_change = Some(Arc::new(callback));
        self
    }

    pub fn post_id(&self) -> PostId {
        self.post_id
    }

    pub fn snapshot(&self) -> LikeState {
        self.shared.lock().clone()
    }

    pub fn liked(&self) -> bool {
        self.shared.lock().liked
    }

    pub fn like_count(&self) -> usize {
        self.shared.lock().likes.len()
    }

    pub fn tooltip_visible(&self) -> bool {
        self.shared.lock().tooltip_visible
    }

    pub fn is_toggling(&self) -> bool {
        self.shared.toggling.load(Ordering::Acquire)
    }

    /// Replace the liker set from outside, e.g. after the post was re-fetched.
    pub fn set_likes(&self, likes: Vec<LikeEntry>) {
        let mut state = self.shared.lock();
        state.liked = contains_liker(&likes, self.current_user);
        state.tooltip_data = likes.clone();
        state.likes = likes;
    }

    pub fn set_current_user(&mut self, user_id: UserId) {
        self.current_user = user_id;
        let mut state = self.shared.lock();
        state.liked = contains_liker(&state.likes, user_id);
    }

    /// Like or unlike depending on the current state, then adopt the server's
    /// liker set. Nothing changes locally unless the server call succeeds.
    pub async fn toggle(&self) -> ClientResult<Vec<LikeEntry>> {
        let Some(_in_flight) = InFlight::acquire(&self.shared.toggling) else {
            debug!(post_id = self.post_id, "Ignoring like toggle while one is pending");
            return Err(ClientError::ToggleInFlight(self.post_id));
        };

        let liked = self.shared.lock().liked;
        let likes = self
            .gateway
            .toggle_like(self.post_id, self.current_user, liked)
            .await
            .map_err(|e| {
                error!(post_id = self.post_id, "Failed to toggle like: {}", e);
                e
            })?;

        {
            let mut state = self.shared.lock();
            state.liked = contains_liker(&likes, self.current_user);
            state.likes = likes.clone();
            state.tooltip_data = likes.clone();
        }

        if let Some(callback) = &self.on_change {
            callback(self.post_id, &likes);
        }
        Ok(likes)
    }

    /// Start (or restart) the tooltip delay. Only once it elapses are the
    /// likers fetched and the tooltip shown.
    pub fn pointer_enter(&mut self) {
        self.cancel_hover();

        let gateway = Arc::clone(&self.gateway);
        let shared = Arc::clone(&self.shared);
        let post_id = self.post_id;
        let delay = self.tooltip_delay;

        self.hover = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match gateway.fetch_likers(post_id).await {
                Ok(likers) => {
                    let mut state = shared.lock();
                    state.tooltip_data = likers;
                    state.tooltip_visible = true;
                }
                Err(e) => warn!(post_id, "Failed to load likers: {}", e),
            }
        }));
    }

    pub fn pointer_leave(&mut self) {
        self.cancel_hover();
        self.shared.lock().tooltip_visible = false;
    }

    pub fn is_tooltip_pending(&self) -> bool {
        self.hover.as_ref().is_some_and(|h| !h.is_finished())
    }

    fn cancel_hover(&mut self) {
        if let Some(handle) = self.hover.take() {
            handle.abort();
        }
    }
}

impl<G: Gateway + 'static> Drop for LikeControl<G> {
    fn drop(&mut self) {
        self.cancel_hover();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, FakeGateway, alice, bob};

    fn entry(user: &quill_types::models::User) -> LikeEntry {
        LikeEntry { id: user.id, username: user.username.clone() }
    }

    fn fetches(gw: &FakeGateway) -> usize {
        gw.count(|c| matches!(c, Call::FetchLikers(_)))
    }

    #[test]
    fn liked_is_derived_from_membership() {
        let gw = FakeGateway::new();
        let mut control = LikeControl::new(gw, 10, alice().id, vec![entry(&bob())]);
        assert!(!control.liked());

        control.set_current_user(bob().id);
        assert!(control.liked());

        control.set_likes(Vec::new());
        assert!(!control.liked());
    }

    #[tokio::test]
    async fn toggle_adopts_server_set_both_ways() {
        let gw = FakeGateway::new();
        gw.with(|s| {
            s.users = vec![alice(), bob()];
            s.likes.insert(10, vec![entry(&bob())]);
        });
        let control = LikeControl::new(gw.clone(), 10, alice().id, vec![entry(&bob())]);

        let likes = control.toggle().await.unwrap();
        assert!(control.liked());
        assert_eq!(likes, vec![entry(&bob()), entry(&alice())]);
        assert_eq!(control.snapshot().likes, likes);

        let likes = control.toggle().await.unwrap();
        assert!(!control.liked());
        assert_eq!(likes, vec![entry(&bob())]);

        assert_eq!(
            gw.calls(),
            vec![
                Call::ToggleLike { post_id: 10, liked: false },
                Call::ToggleLike { post_id: 10, liked: true },
            ]
        );
    }

    #[tokio::test]
    async fn failed_toggle_leaves_state_alone() {
        let gw = FakeGateway::new();
        gw.fail("toggle_like");
        let control = LikeControl::new(gw.clone(), 10, alice().id, vec![entry(&bob())]);
        let before = control.snapshot();

        let err = control.toggle().await.unwrap_err();
        assert!(matches!(err, ClientError::Api(_)));
        assert_eq!(control.snapshot(), before);
        assert!(!control.is_toggling());
    }

    #[tokio::test]
    async fn second_click_while_pending_is_rejected() {
        let gw = FakeGateway::new();
        let control = LikeControl::new(gw.clone(), 10, alice().id, Vec::new());

        let (first, second) = tokio::join!(control.toggle(), control.toggle());
        assert!(first.is_ok());
        assert!(matches!(second, Err(ClientError::ToggleInFlight(10))));
        assert_eq!(gw.count(|c| matches!(c, Call::ToggleLike { .. })), 1);
        assert!(control.liked());

        // The guard is released once the first toggle settles.
        control.toggle().await.unwrap();
        assert!(!control.liked());
    }

    #[tokio::test]
    async fn change_callback_receives_server_set() {
        let gw = FakeGateway::new();
        let seen: Arc<Mutex<Vec<(PostId, usize)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        let control = LikeControl::new(gw, 10, alice().id, Vec::new())
            .on_change(move |post_id, likes| sink.lock().unwrap().push((post_id, likes.len())));

        control.toggle().await.unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![(10, 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn short_hover_never_fetches() {
        let gw = FakeGateway::new();
        let mut control = LikeControl::new(gw.clone(), 10, alice().id, Vec::new());

        control.pointer_enter();
        tokio::time::sleep(Duration::from_millis(300)).await;
        control.pointer_leave();
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(fetches(&gw), 0);
        assert!(!control.tooltip_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn long_hover_fetches_exactly_once() {
        let gw = FakeGateway::new();
        gw.with(|s| {
            s.likes.insert(10, vec![entry(&bob())]);
        });
        let mut control = LikeControl::new(gw.clone(), 10, alice().id, Vec::new());

        control.pointer_enter();
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(fetches(&gw), 1);
        let state = control.snapshot();
        assert!(state.tooltip_visible);
        assert_eq!(state.tooltip_data, vec![entry(&bob())]);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(fetches(&gw), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn re_entering_restarts_the_delay() {
        let gw = FakeGateway::new();
        let mut control = LikeControl::new(gw.clone(), 10, alice().id, Vec::new());

        control.pointer_enter();
        tokio::time::sleep(Duration::from_millis(300)).await;
        control.pointer_enter();
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fetches(&gw), 0);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fetches(&gw), 1);
        assert!(control.tooltip_visible());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_the_control_cancels_pending_fetch() {
        let gw = FakeGateway::new();
        let mut control = LikeControl::new(gw.clone(), 10, alice().id, Vec::new());

        control.pointer_enter();
        assert!(control.is_tooltip_pending());
        drop(control);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(fetches(&gw), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_hides_a_visible_tooltip() {
        let gw = FakeGateway::new();
        let mut control = LikeControl::new(gw.clone(), 10, alice().id, Vec::new())
            .with_tooltip_delay(Duration::from_millis(100));

        control.pointer_enter();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(control.tooltip_visible());

        control.pointer_leave();
        assert!(!control.tooltip_visible());
    }
}
