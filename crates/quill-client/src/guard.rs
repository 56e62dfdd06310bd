use tracing::debug;

use crate::router::Route;
use crate::session::Session;

/// Anything that can be rendered for a session. Closures taking `&Session`
/// qualify.
pub trait View {
    type Output;

    fn render(&self, session: &Session) -> Self::Output;
}

impl<F, T> View for F
where
    F: Fn(&Session) -> T,
{
    type Output = T;

    fn render(&self, session: &Session) -> T {
        self(session)
    }
}

/// Result of passing a view through the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    /// Session still hydrating: show a neutral placeholder, never a redirect.
    Pending,
    Redirect(Route),
    Render(T),
}

impl<T> Guarded<T> {
    pub fn into_rendered(self) -> Option<T> {
        match self {
            Self::Render(out) => Some(out),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouteGuard {
    login: Route,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self { login: Route::Login }
    }
}

impl RouteGuard {
    pub fn render<V: View>(&self, session: &Session, view: &V) -> Guarded<V::Output> {
        if session.is_loading {
            return Guarded::Pending;
        }
        if !session.is_authenticated {
            debug!("Unauthenticated, redirecting to {}", self.login);
            return Guarded::Redirect(self.login.clone());
        }
        Guarded::Render(view.render(session))
    }

    /// Guard a navigation. Public routes always render.
    pub fn route<V: View>(&self, route: &Route, session: &Session, view: &V) -> Guarded<V::Output> {
        if route.is_protected() {
            self.render(session, view)
        } else {
            Guarded::Render(view.render(session))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::alice;

    fn session(is_loading: bool, is_authenticated: bool) -> Session {
        Session {
            token: is_authenticated.then(|| "tok".to_string()),
            user: is_authenticated.then(alice),
            is_authenticated,
            is_loading,
        }
    }

    fn greeting(s: &Session) -> String {
        format!("hello {}", s.user.as_ref().map(|u| u.username.as_str()).unwrap_or("?"))
    }

    #[test]
    fn loading_session_renders_placeholder() {
        let guard = RouteGuard::default();
        // Even a provisional "authenticated" flag must not leak through.
        assert_eq!(guard.render(&session(true, true), &greeting), Guarded::Pending);
        assert_eq!(guard.render(&session(true, false), &greeting), Guarded::Pending);
    }

    #[test]
    fn anonymous_session_is_redirected_to_login() {
        let guard = RouteGuard::default();
        assert_eq!(guard.render(&session(false, false), &greeting), Guarded::Redirect(Route::Login));
    }

    #[test]
    fn authenticated_session_renders_view_unchanged() {
        let guard = RouteGuard::default();
        let out = guard.render(&session(false, true), &greeting);
        assert_eq!(out.into_rendered().as_deref(), Some("hello alice"));
    }

    #[test]
    fn public_routes_skip_the_guard() {
        let guard = RouteGuard::default();
        let out = guard.route(&Route::Register, &session(false, false), &|_: &Session| "form");
        assert_eq!(out, Guarded::Render("form"));
    }
}
