use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use quill_api::Storage;
use quill_api::storage::{TOKEN_KEY, USER_KEY};
use quill_types::UserId;
use quill_types::claims::Claims;
use quill_types::models::User;

use crate::error::ClientResult;

/// Authentication state as seen by views.
///
/// While `is_loading` is set, `is_authenticated` is provisional and protected
/// content must not be rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: Option<String>,
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub is_loading: bool,
}

impl Session {
    fn loading() -> Self {
        Self {
            token: None,
            user: None,
            is_authenticated: false,
            is_loading: true,
        }
    }

    pub fn user_id(&self) -> Option<UserId> {
        if self.is_authenticated {
            self.user.as_ref().map(|u| u.id)
        } else {
            None
        }
    }
}

/// Owns the session and keeps it in sync with persisted storage. The token
/// and user keys are always written or cleared together.
pub struct SessionStore {
    storage: Arc<dyn Storage>,
    session: Session,
}

impl SessionStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            session: Session::loading(),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn is_authenticated(&self) -> bool {
        self.session.is_authenticated
    }

    pub fn is_loading(&self) -> bool {
        self.session.is_loading
    }

    pub fn user(&self) -> Option<&User> {
        self.session.user.as_ref()
    }

    /// Hydrate from storage. Any problem with the stored credential logs the
    /// session out; nothing here is reported to the caller.
    pub fn initialize(&mut self) {
        if !self.session.is_loading {
            debug!("Session already initialized");
            return;
        }

        self.restore();
        self.session.is_loading = false;
    }

    fn restore(&mut self) {
        let (Some(stored_user), Some(token)) = (self.read(USER_KEY), self.read(TOKEN_KEY)) else {
            debug!("No stored session");
            return;
        };

        let claims = match Claims::decode_unverified(&token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!("Stored token could not be decoded, logging out: {}", e);
                self.logout();
                return;
            }
        };

        if claims.is_expired_at(Utc::now()) {
            info!("Stored token expired, logging out");
            self.logout();
            return;
        }

        let user: User = match serde_json::from_str(&stored_user) {
            Ok(user) => user,
            Err(e) => {
                warn!("Stored user is unreadable, logging out: {}", e);
                self.logout();
                return;
            }
        };

        info!(user_id = user.id, "Session restored for {}", user.username);
        self.session.token = Some(token);
        self.session.user = Some(user);
        self.session.is_authenticated = true;
    }

    fn read(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(e) => {
                warn!("Failed to read {} from storage: {}", key, e);
                None
            }
        }
    }

    /// Store a freshly issued credential. The token is trusted as-is.
    pub fn login(&mut self, user: User, token: String) -> ClientResult<()> {
        let user_json = serde_json::to_string(&user)?;
        let persisted = self
            .storage
            .set(USER_KEY, &user_json)
            .and_then(|_| self.storage.set(TOKEN_KEY, &token));
        if let Err(e) = persisted {
            warn!("Failed to persist session: {}", e);
            self.logout();
            return Err(e.into());
        }

        info!(user_id = user.id, "Logged in as {}", user.username);
        self.session.token = Some(token);
        self.session.user = Some(user);
        self.session.is_authenticated = true;
        Ok(())
    }

    /// Persist `token` and authenticate only if it decodes and is unexpired;
    /// otherwise the whole session is logged out.
    pub fn set_token(&mut self, token: String) -> ClientResult<()> {
        self.storage.set(TOKEN_KEY, &token)?;

        match Claims::decode_unverified(&token) {
            Ok(claims) if !claims.is_expired_at(Utc::now()) => {
                self.session.token = Some(token);
                self.session.is_authenticated = true;
            }
            Ok(_) => {
                info!("Received an already expired token, logging out");
                self.logout();
            }
            Err(e) => {
                warn!("Received an undecodable token, logging out: {}", e);
                self.logout();
            }
        }
        Ok(())
    }

    /// Replace the cached profile. Leaves the credential untouched.
    pub fn set_user(&mut self, user: User) -> ClientResult<()> {
        self.storage.set(USER_KEY, &serde_json::to_string(&user)?)?;
        self.session.user = Some(user);
        Ok(())
    }

    /// Re-check the token's expiry. Returns whether the session survived.
    pub fn revalidate(&mut self) -> bool {
        if !self.session.is_authenticated {
            return false;
        }

        let valid = self
            .session
            .token
            .as_deref()
            .and_then(|t| Claims::decode_unverified(t).ok())
            .is_some_and(|c| !c.is_expired_at(Utc::now()));
        if !valid {
            info!("Session token no longer valid, logging out");
            self.logout();
        }
        valid
    }

    pub fn logout(&mut self) {
        if self.session.is_authenticated {
            info!("Logged out");
        }
        self.session.is_authenticated = false;
        self.session.user = None;
        self.session.token = None;

        for key in [USER_KEY, TOKEN_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!("Failed to clear {} from storage: {}", key, e);
            }
        }
    }
}
