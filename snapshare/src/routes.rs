//! Navigational surface and its access guard.

use std::fmt;

use url::Url;

use crate::session::SessionState;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Signup,
    Home,
    CreatePost,
    Profile { uid: String, setup: bool },
    Search,
    Notifications,
    Chat { chat_id: Option<String> },
}

/// What to render for a requested route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Session still resolving; show a loading indicator.
    Loading,
    Render(Route),
    Redirect(Route),
}

impl Route {
    /// Parses a path such as `/profile/abc?setup=true`. Unknown paths map to `Home`.
    pub fn parse(path: &str) -> Route {
        let Ok(url) = Url::parse("app://snapshare").and_then(|base| base.join(path)) else {
            return Route::Home;
        };
        let segments: Vec<&str> = url
            .path_segments()
            .map(|segments| segments.filter(|segment| !segment.is_empty()).collect())
            .unwrap_or_default();
        let setup = url
            .query_pairs()
            .any(|(key, value)| key == "setup" && value == "true");

        match segments.as_slice() {
            ["login"] => Route::Login,
            ["signup"] => Route::Signup,
            [] => Route::Home,
            ["create"] => Route::CreatePost,
            ["profile", uid] => Route::Profile {
                uid: (*uid).to_string(),
                setup,
            },
            ["search"] => Route::Search,
            ["notifications"] => Route::Notifications,
            ["chat"] => Route::Chat { chat_id: None },
            ["chat", chat_id] => Route::Chat {
                chat_id: Some((*chat_id).to_string()),
            },
            _ => Route::Home,
        }
    }

    pub fn is_public(&self) -> bool {
        matches!(self, Route::Login | Route::Signup)
    }

    pub fn profile_setup(uid: impl Into<String>) -> Route {
        Route::Profile {
            uid: uid.into(),
            setup: true,
        }
    }

    /// Decides what the guard shows for this route in the given session state.
    pub fn resolve(self, state: &SessionState) -> RouteDecision {
        match state {
            SessionState::Loading => RouteDecision::Loading,
            SessionState::SignedOut if self.is_public() => RouteDecision::Render(self),
            SessionState::SignedOut => RouteDecision::Redirect(Route::Login),
            SessionState::SignedIn(_) if self.is_public() => RouteDecision::Redirect(Route::Home),
            SessionState::SignedIn(user) if user.needs_profile_setup() => match &self {
                Route::Profile { uid, .. } if uid == user.uid() => RouteDecision::Render(self),
                _ => RouteDecision::Redirect(Route::profile_setup(user.uid())),
            },
            SessionState::SignedIn(_) => RouteDecision::Render(self),
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Login => f.write_str("/login"),
            Route::Signup => f.write_str("/signup"),
            Route::Home => f.write_str("/"),
            Route::CreatePost => f.write_str("/create"),
            Route::Profile { uid, setup: false } => write!(f, "/profile/{uid}"),
            Route::Profile { uid, setup: true } => write!(f, "/profile/{uid}?setup=true"),
            Route::Search => f.write_str("/search"),
            Route::Notifications => f.write_str("/notifications"),
            Route::Chat { chat_id: None } => f.write_str("/chat"),
            Route::Chat { chat_id: Some(id) } => write!(f, "/chat/{id}"),
        }
    }
}
