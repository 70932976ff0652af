use std::sync::Arc;

use log::{error, info};

use crate::{
    client::SnapshareClient,
    errors::AppError,
    identity::{Identity, IdentityProvider, SsoAssertion},
    models::UserProfile,
    session::{CurrentUser, Session},
    validators::{MAX_USERNAME_LENGTH, username_from_display_name, validate_username},
};

use super::profiles::ensure_username_available;

/// Sign-up, sign-in and sign-out, keeping the session in step.
#[derive(Clone)]
pub struct AccountService {
    client: SnapshareClient,
    identity: Arc<dyn IdentityProvider>,
    session: Session,
}

impl AccountService {
    pub fn new(client: SnapshareClient, identity: Arc<dyn IdentityProvider>, session: Session) -> Self {
        Self {
            client,
            identity,
            session,
        }
    }

    /// Creates an email/password account and its profile document.
    ///
    /// The username format and availability are checked before the account
    /// exists; the profile is written after. A failed profile write leaves the account without a profile.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
        display_name: &str,
    ) -> Result<CurrentUser, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::UsernameRequired);
        }
        validate_username(username)?;
        ensure_username_available(&self.client, username, None).await?;

        let identity = self
            .identity
            .sign_up(email, password, display_name)
            .await
            .map_err(AppError::sign_up)?;

        let profile = UserProfile {
            id: identity.uid.clone(),
            username: username.to_string(),
            display_name: display_name.trim().to_string(),
            email: identity.email.clone(),
            bio: String::new(),
            photo_url: String::new(),
            followers: Vec::new(),
            following: Vec::new(),
            is_profile_complete: true,
        };
        self.client
            .users()
            .set(&profile)
            .await
            .inspect_err(|err| error!("failed to create profile for {}: {err}", identity.uid))?;
        info!("signed up {} as {}", identity.uid, profile.username);
        Ok(self.session.hydrate(identity, &self.client.users()).await)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<CurrentUser, AppError> {
        let identity = self
            .identity
            .sign_in(email, password)
            .await
            .map_err(AppError::login)?;
        Ok(self.session.hydrate(identity, &self.client.users()).await)
    }

    /// Signs in through SSO. First-time users get a profile derived from their
    /// display name, flagged incomplete so they are sent to profile setup.
    pub async fn sign_in_with_sso(&self, assertion: &SsoAssertion) -> Result<CurrentUser, AppError> {
        let identity = self
            .identity
            .sign_in_with_sso(assertion)
            .await
            .map_err(AppError::sign_up_with_sso)?;

        let users = self.client.users();
        if users.get(&identity.uid).await?.is_none() {
            let profile = initial_sso_profile(&identity);
            users
                .set(&profile)
                .await
                .inspect_err(|err| error!("failed to create profile for {}: {err}", identity.uid))?;
            info!("created profile {} from single sign-on", profile.id);
        }
        Ok(self.session.hydrate(identity, &users).await)
    }

    pub async fn sign_out(&self) -> Result<(), AppError> {
        if let Some(user) = self.session.current_user() {
            self.identity
                .sign_out(user.uid())
                .await
                .map_err(|source| AppError::Auth {
                    action: "Failed to sign out".into(),
                    source,
                })?;
        }
        self.session.clear();
        Ok(())
    }
}

fn initial_sso_profile(identity: &Identity) -> UserProfile {
    let display_name = identity.display_name.clone().unwrap_or_default();
    let mut username = username_from_display_name(&display_name);
    if username.is_empty() {
        username = identity
            .email
            .split('@')
            .next()
            .map(username_from_display_name)
            .unwrap_or_default();
    }
    if username.is_empty() {
        username = identity.uid.to_lowercase();
    }
    let username = username.chars().take(MAX_USERNAME_LENGTH).collect();
    UserProfile {
        id: identity.uid.clone(),
        username,
        display_name,
        email: identity.email.clone(),
        bio: String::new(),
        photo_url: identity.photo_url.clone().unwrap_or_default(),
        followers: Vec::new(),
        following: Vec::new(),
        is_profile_complete: false,
    }
}
