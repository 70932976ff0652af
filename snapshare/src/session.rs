//! Signed-in user context shared by the services.
//!
//! The session starts in `Loading`, becomes `SignedIn` once the profile document
//! of the authenticated identity has been read, and returns to `SignedOut` on
//! sign-out. Observers follow state changes through a watch channel.

use log::{debug, warn};
use tokio::sync::watch;

use crate::{
    errors::AppError,
    identity::Identity,
    models::UserProfile,
    store::Collection,
};

/// The authenticated identity together with its profile document, if one exists yet.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrentUser {
    pub identity: Identity,
    pub profile: Option<UserProfile>,
}

impl CurrentUser {
    pub fn uid(&self) -> &str {
        &self.identity.uid
    }

    /// Profiles that are missing or flagged incomplete need the setup step.
    pub fn needs_profile_setup(&self) -> bool {
        self.profile.as_ref().is_none_or(|profile| !profile.is_profile_complete)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionState {
    Loading,
    SignedOut,
    SignedIn(CurrentUser),
}

#[derive(Clone)]
pub struct Session {
    state: watch::Sender<SessionState>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Loading);
        Self { state }
    }

    /// A session that starts signed out instead of loading.
    pub fn signed_out() -> Self {
        let session = Self::new();
        session.clear();
        session
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn watch(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    pub fn is_loading(&self) -> bool {
        matches!(*self.state.borrow(), SessionState::Loading)
    }

    pub fn current_user(&self) -> Option<CurrentUser> {
        match &*self.state.borrow() {
            SessionState::SignedIn(user) => Some(user.clone()),
            _ => None,
        }
    }

    pub fn require_user(&self) -> Result<CurrentUser, AppError> {
        self.current_user().ok_or(AppError::NotSignedIn)
    }

    /// Loads the profile for `identity` and marks the session signed in.
    ///
    /// A profile that cannot be read leaves the user signed in without one.
    pub async fn hydrate(&self, identity: Identity, profiles: &Collection<UserProfile>) -> CurrentUser {
        let profile = match profiles.get(&identity.uid).await {
            Ok(profile) => profile,
            Err(err) => {
                warn!("could not load profile for {}: {err}", identity.uid);
                None
            }
        };
        let user = CurrentUser { identity, profile };
        self.set_user(user.clone());
        user
    }

    /// Re-reads the signed-in user's profile after a profile write.
    pub async fn refresh(&self, profiles: &Collection<UserProfile>) -> Option<CurrentUser> {
        let user = self.current_user()?;
        Some(self.hydrate(user.identity, profiles).await)
    }

    pub fn set_user(&self, user: CurrentUser) {
        debug!("session signed in as {}", user.uid());
        self.state.send_replace(SessionState::SignedIn(user));
    }

    pub fn clear(&self) {
        self.state.send_replace(SessionState::SignedOut);
    }
}
