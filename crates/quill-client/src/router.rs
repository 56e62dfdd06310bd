use std::fmt;

use quill_types::PostId;

/// Client-side pages. Everything except login and register sits behind the
/// route guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Feed,
    Logout,
    /// `None` is the viewer's own profile.
    Profile(Option<String>),
    Post(PostId),
}

impl Route {
    pub fn parse(path: &str) -> Option<Self> {
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        match segments.as_slice() {
            [] => Some(Self::Feed),
            ["login"] => Some(Self::Login),
            ["register"] => Some(Self::Register),
            ["logout"] => Some(Self::Logout),
            ["profile"] => Some(Self::Profile(None)),
            ["profile", username] => Some(Self::Profile(Some((*username).to_string()))),
            ["post", id] => id.parse().ok().map(Self::Post),
            _ => None,
        }
    }

    pub fn path(&self) -> String {
        match self {
            Self::Login => "/login".into(),
            Self::Register => "/register".into(),
            Self::Feed => "/".into(),
            Self::Logout => "/logout".into(),
            Self::Profile(None) => "/profile".into(),
            Self::Profile(Some(username)) => format!("/profile/{}", username),
            Self::Post(id) => format!("/post/{}", id),
        }
    }

    pub fn is_protected(&self) -> bool {
        !matches!(self, Self::Login | Self::Register)
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_paths() {
        assert_eq!(Route::parse("/"), Some(Route::Feed));
        assert_eq!(Route::parse("/login"), Some(Route::Login));
        assert_eq!(Route::parse("/profile/"), Some(Route::Profile(None)));
        assert_eq!(Route::parse("/profile/bob"), Some(Route::Profile(Some("bob".into()))));
        assert_eq!(Route::parse("/post/42"), Some(Route::Post(42)));
        assert_eq!(Route::parse("/post/abc"), None);
        assert_eq!(Route::parse("/settings"), None);
    }

    #[test]
    fn only_auth_pages_are_public() {
        assert!(!Route::Login.is_protected());
        assert!(!Route::Register.is_protected());
        assert!(Route::Feed.is_protected());
        assert!(Route::Post(1).is_protected());
    }

    #[test]
    fn path_round_trips_through_parse() {
        let route = Route::Profile(Some("carol".into()));
        assert_eq!(Route::parse(&route.path()), Some(route));
    }
}
