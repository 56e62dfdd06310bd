use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::join_all;
use tracing::{debug, error, info, warn};

use quill_api::Gateway;
use quill_types::models::Notification;
use quill_types::{NotificationId, UserId};

use crate::document::{ClickListener, Document};
use crate::error::{ClientError, ClientResult};
use crate::router::Route;
use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropdownState {
    Closed,
    Open,
}

/// Which link inside a notification was followed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkTarget {
    Post,
    Liker,
}

/// Bell, badge and dropdown for the signed-in user's notifications.
///
/// An outside-click listener is registered on the [`Document`] exactly while
/// the dropdown is open. Call [`process_clicks`](Self::process_clicks) after
/// dispatching pointer events to let it react.
pub struct NotificationCenter<G: Gateway> {
    gateway: Arc<G>,
    document: Document,
    user_id: Option<UserId>,
    notifications: Vec<Notification>,
    /// Unread ids the user has already seen in an opened dropdown.
    seen: HashSet<NotificationId>,
    listener: Option<ClickListener>,
}

impl<G: Gateway> NotificationCenter<G> {
    pub fn new(gateway: Arc<G>, document: Document, session: &Session) -> Self {
        Self {
            gateway,
            document,
            user_id: session.user_id(),
            notifications: Vec::new(),
            seen: HashSet::new(),
            listener: None,
        }
    }

    /// Initial load. Does nothing without a signed-in user.
    pub async fn mount(&mut self) -> ClientResult<()> {
        if self.user_id.is_none() {
            debug!("No user in session, skipping notification load");
            return Ok(());
        }
        self.refresh().await
    }

    /// Re-fetch the list. On failure the previous list is kept.
    pub async fn refresh(&mut self) -> ClientResult<()> {
        let user_id = self.user_id.ok_or(ClientError::NotAuthenticated)?;
        let notifications = self.gateway.list_notifications(user_id).await.map_err(|e| {
            error!(user_id, "Failed to load notifications: {}", e);
            e
        })?;

        self.seen.retain(|id| notifications.iter().any(|n| n.id == *id));
        self.notifications = notifications;
        debug!(user_id, count = self.notifications.len(), unread = self.badge(), "Notifications loaded");
        Ok(())
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn unread_count(&self) -> usize {
        self.notifications.iter().filter(|n| !n.is_read).count()
    }

    /// Number shown on the bell: unread entries not yet seen in the dropdown.
    pub fn badge(&self) -> usize {
        self.notifications
            .iter()
            .filter(|n| !n.is_read && !self.seen.contains(&n.id))
            .count()
    }

    pub fn state(&self) -> DropdownState {
        if self.listener.is_some() {
            DropdownState::Open
        } else {
            DropdownState::Closed
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == DropdownState::Open
    }

    pub fn open(&mut self) {
        if self.is_open() {
            return;
        }
        self.seen
            .extend(self.notifications.iter().filter(|n| !n.is_read).map(|n| n.id));
        self.listener = Some(self.document.subscribe());
    }

    /// Close the dropdown and acknowledge everything that was unread.
    pub async fn close(&mut self) -> ClientResult<()> {
        if self.listener.take().is_none() {
            return Ok(());
        }
        self.acknowledge_all().await
    }

    pub async fn toggle(&mut self) -> ClientResult<()> {
        if self.is_open() {
            self.close().await
        } else {
            self.open();
            Ok(())
        }
    }

    /// React to pointer presses dispatched since the last call. Returns
    /// whether an outside press closed the dropdown.
    pub async fn process_clicks(&mut self) -> ClientResult<bool> {
        let outside = match self.listener.as_mut() {
            Some(listener) => listener.drain_outside(),
            None => return Ok(false),
        };
        if outside {
            self.close().await?;
        }
        Ok(outside)
    }

    /// One mark-read request per unread entry, all in flight together. Local
    /// entries flip to read only if every request succeeds.
    pub async fn acknowledge_all(&mut self) -> ClientResult<()> {
        let unread: Vec<NotificationId> = self
            .notifications
            .iter()
            .filter(|n| !n.is_read)
            .map(|n| n.id)
            .collect();
        if unread.is_empty() {
            return Ok(());
        }

        let gateway = &self.gateway;
        let results = join_all(unread.iter().map(|id| gateway.mark_notification_read(*id))).await;

        let mut first_err = None;
        for (id, result) in unread.iter().zip(results) {
            if let Err(e) = result {
                warn!(notification_id = id, "Failed to mark notification read: {}", e);
                first_err.get_or_insert(e);
            }
        }
        if let Some(e) = first_err {
            return Err(e.into());
        }

        for notification in &mut self.notifications {
            notification.is_read = true;
        }
        debug!(count = unread.len(), "Notifications acknowledged");
        Ok(())
    }

    /// Delete every notification on the server, then locally.
    pub async fn clear(&mut self) -> ClientResult<()> {
        let user_id = self.user_id.ok_or(ClientError::NotAuthenticated)?;
        self.gateway.clear_notifications(user_id).await.map_err(|e| {
            error!(user_id, "Failed to clear notifications: {}", e);
            e
        })?;

        info!(user_id, "Cleared {} notifications", self.notifications.len());
        self.notifications.clear();
        self.seen.clear();
        Ok(())
    }

    /// Follow a link inside one notification. The entry is marked read on a
    /// best-effort basis; the route is returned either way.
    pub async fn click_through(&mut self, id: NotificationId, target: LinkTarget) -> ClientResult<Route> {
        let notification = self
            .notifications
            .iter()
            .find(|n| n.id == id)
            .ok_or(ClientError::UnknownNotification(id))?;

        let route = match target {
            LinkTarget::Post => notification.post_id.map(Route::Post).ok_or(ClientError::MissingLink(id, "post"))?,
            LinkTarget::Liker => notification
                .liker_username
                .clone()
                .map(|name| Route::Profile(Some(name)))
                .ok_or(ClientError::MissingLink(id, "liker"))?,
        };

        match self.gateway.mark_notification_read(id).await {
            Ok(()) => {
                if let Some(n) = self.notifications.iter_mut().find(|n| n.id == id) {
                    n.is_read = true;
                }
            }
            Err(e) => warn!(notification_id = id, "Failed to mark notification read: {}", e),
        }
        Ok(route)
    }
}
