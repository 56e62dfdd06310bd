use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use tracing::{info, warn};

use quill_api::{ApiError, ClientConfig, FileStorage, Gateway, HttpGateway, Storage};
use quill_client::auth_flow::{self, RegisterForm};
use quill_client::notifications::{LinkTarget, NotificationCenter};
use quill_client::views::{Feed, PostPage, ProfileView};
use quill_client::{ClientError, Document, Guarded, LikeControl, Route, RouteGuard, Session, SessionStore};
use quill_types::{PostId, UserId};
use quill_types::models::{Notification, Post};

use crate::{Command, NotificationCommand, PostCommand};

/// Inline message for a failed action. Details were already logged where the
/// failure happened.
fn shown(e: ClientError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}

fn shown_api(e: ApiError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}

fn print_post(post: &Post) {
    println!(
        "#{} {} by {} ({} likes)\n    {}",
        post.id,
        post.title,
        post.author_username,
        post.likes.len(),
        post.content
    );
}

fn print_notification(n: &Notification) {
    let marker = if n.is_read { ' ' } else { '*' };
    println!(
        "{} [{}] {}  {}",
        marker,
        n.id,
        n.display_text(),
        n.created_at.format("%Y-%m-%d %H:%M")
    );
}

pub struct App {
    config: ClientConfig,
    gateway: Arc<HttpGateway>,
    session: SessionStore,
    guard: RouteGuard,
}

impl App {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        let storage: Arc<dyn Storage> = Arc::new(
            FileStorage::open(&config.state_dir)
                .with_context(|| format!("opening state dir {}", config.state_dir.display()))?,
        );
        let gateway = Arc::new(HttpGateway::new(&config, Arc::clone(&storage))?);

        let mut session = SessionStore::new(storage);
        session.initialize();

        Ok(Self {
            config,
            gateway,
            session,
            guard: RouteGuard::default(),
        })
    }

    /// Pass `route` through the guard. Yields the signed-in user's id.
    fn require(&mut self, route: Route) -> anyhow::Result<UserId> {
        self.session.revalidate();
        match self.guard.route(&route, self.session.session(), &|s: &Session| s.user_id()) {
            Guarded::Render(Some(user_id)) => Ok(user_id),
            Guarded::Redirect(to) => bail!("Not signed in ({} requires a session, go to {}). Run `quill login`.", route, to),
            Guarded::Render(None) | Guarded::Pending => bail!("Not signed in. Run `quill login`."),
        }
    }

    pub async fn run(&mut self, command: Command) -> anyhow::Result<()> {
        match command {
            Command::Login { email, password } => {
                self.require_public(Route::Login)?;
                auth_flow::login(self.gateway.as_ref(), &mut self.session, &email, &password)
                    .await
                    .map_err(shown)?;
                self.whoami()
            }
            Command::Register { username, email, password } => {
                self.require_public(Route::Register)?;
                let form = RegisterForm { username, email, password };
                auth_flow::register(self.gateway.as_ref(), &mut self.session, &form)
                    .await
                    .map_err(shown)?;
                self.whoami()
            }
            Command::Logout => {
                let next = auth_flow::logout(&mut self.session);
                println!("Signed out. Next: {}", next);
                Ok(())
            }
            Command::Whoami => self.whoami(),
            Command::Feed => self.feed().await,
            Command::Post(cmd) => self.post(cmd).await,
            Command::Profile { username } => self.profile(username).await,
            Command::Like { post_id } => self.like(post_id).await,
            Command::Likers { post_id } => {
                self.require(Route::Post(post_id))?;
                let likers = self.gateway.fetch_likers(post_id).await.map_err(shown_api)?;
                if likers.is_empty() {
                    println!("No likes yet");
                }
                for liker in likers {
                    println!("{} ({})", liker.username, liker.id);
                }
                Ok(())
            }
            Command::Notifications(cmd) => self.notifications(cmd).await,
        }
    }

    /// Public pages render regardless of the session.
    fn require_public(&self, route: Route) -> anyhow::Result<()> {
        match self.guard.route(&route, self.session.session(), &|_: &Session| ()) {
            Guarded::Render(()) => Ok(()),
            _ => bail!("{} is unavailable", route),
        }
    }

    fn whoami(&mut self) -> anyhow::Result<()> {
        self.require(Route::Profile(None))?;
        match self.session.user() {
            Some(user) => println!("Signed in as {} <{}> (id {})", user.username, user.email, user.id),
            None => println!("Signed in"),
        }
        Ok(())
    }

    async fn feed(&mut self) -> anyhow::Result<()> {
        self.require(Route::Feed)?;
        let mut feed = Feed::new(Arc::clone(&self.gateway));
        feed.load().await.map_err(shown)?;
        if feed.posts().is_empty() {
            println!("No posts yet");
        }
        feed.posts().iter().for_each(print_post);
        Ok(())
    }

    async fn post(&mut self, cmd: PostCommand) -> anyhow::Result<()> {
        match cmd {
            PostCommand::New { title, content } => {
                self.require(Route::Feed)?;
                let mut feed = Feed::new(Arc::clone(&self.gateway));
                let post = feed.create_post(&title, &content).await.map_err(shown)?;
                print_post(post);
            }
            PostCommand::Show { id } => {
                self.require(Route::Post(id))?;
                let page = PostPage::load(self.gateway.as_ref(), id).await;
                match page.post() {
                    Some(post) => print_post(post),
                    None => bail!("Post not found"),
                }
            }
            PostCommand::Delete { id } => {
                self.require(Route::Profile(None))?;
                let mut profile = ProfileView::load(Arc::clone(&self.gateway), self.session.session(), None)
                    .await
                    .map_err(shown)?;
                if !profile.posts().iter().any(|p| p.id == id) {
                    bail!("Post #{} is not one of yours", id);
                }
                profile.delete_post(id).await.map_err(shown)?;
                println!("Deleted #{}", id);
            }
        }
        Ok(())
    }

    async fn profile(&mut self, username: Option<String>) -> anyhow::Result<()> {
        self.require(Route::Profile(username.clone()))?;
        let view = ProfileView::load(Arc::clone(&self.gateway), self.session.session(), username.as_deref())
            .await
            .map_err(shown)?;

        let user = view.profile();
        let suffix = if view.is_own_profile() { " (you)" } else { "" };
        println!("{}{} <{}>", user.username, suffix, user.email);
        view.posts().iter().for_each(print_post);
        Ok(())
    }

    async fn like(&mut self, post_id: PostId) -> anyhow::Result<()> {
        let user_id = self.require(Route::Post(post_id))?;
        let post = self.gateway.get_post(post_id).await.map_err(shown_api)?;

        let control = LikeControl::for_post(Arc::clone(&self.gateway), &post, user_id)
            .with_tooltip_delay(self.config.tooltip_delay);
        control.toggle().await.map_err(shown)?;

        let verb = if control.liked() { "Liked" } else { "Unliked" };
        println!("{} #{} ({} likes)", verb, post_id, control.like_count());
        Ok(())
    }

    async fn notifications(&mut self, cmd: NotificationCommand) -> anyhow::Result<()> {
        self.require(Route::Feed)?;
        let document = Document::new();
        let mut center = NotificationCenter::new(Arc::clone(&self.gateway), document, self.session.session());
        center.mount().await.map_err(shown)?;

        match cmd {
            NotificationCommand::List => {
                center.notifications().iter().for_each(print_notification);
                println!("{} unread", center.badge());
            }
            NotificationCommand::Read { id, liker } => {
                let target = if liker { LinkTarget::Liker } else { LinkTarget::Post };
                let route = center.click_through(id, target).await.map_err(shown)?;
                println!("{}", route);
            }
            NotificationCommand::Open => {
                center.open();
                center.notifications().iter().for_each(print_notification);
                let unread = center.unread_count();
                center.close().await.map_err(shown)?;
                println!("Marked {} read", unread);
            }
            NotificationCommand::Clear => {
                center.clear().await.map_err(shown)?;
                println!("Cleared");
            }
            NotificationCommand::Watch { interval } => {
                let period = interval.map(Duration::from_secs).unwrap_or(self.config.poll_interval);
                watch(&mut center, period).await;
            }
        }
        Ok(())
    }
}

/// Print notifications as they arrive until Ctrl-C.
async fn watch<G: Gateway>(center: &mut NotificationCenter<G>, period: Duration) {
    let mut printed: HashSet<_> = HashSet::new();
    let mut ticker = tokio::time::interval(period.max(Duration::from_secs(1)));
    info!(period_secs = period.as_secs(), "Watching notifications");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = center.refresh().await {
                    warn!("Refresh failed, keeping previous list: {}", e);
                    continue;
                }
                for n in center.notifications() {
                    if printed.insert(n.id) {
                        print_notification(n);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Stopped watching");
                break;
            }
        }
    }
}
