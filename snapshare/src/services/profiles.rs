use std::sync::Arc;

use log::{error, info};

use crate::{
    client::SnapshareClient,
    errors::AppError,
    identity::IdentityProvider,
    models::UserProfile,
    session::Session,
    store::{Document, FieldUpdate},
    upload::{ImageUpload, ImageUploader},
    validators::validate_username,
};

/// Edits submitted from the profile form.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub avatar: Option<ImageUpload>,
}

/// Rejects `username` when another profile already uses it. A match on the
/// submitter's own profile never blocks.
///
/// The check and the following write are separate steps, so two concurrent
/// submissions can still claim the same name.
pub async fn ensure_username_available(
    client: &SnapshareClient,
    username: &str,
    submitter: Option<&str>,
) -> Result<(), AppError> {
    let users = client.users();
    let matches = users.find_many(&users.query().where_eq("username", username)).await?;
    match matches.into_iter().find(|profile| Some(profile.id.as_str()) != submitter) {
        Some(existing) => Err(AppError::UsernameTaken {
            username: username.to_string(),
            existing_id: existing.id,
        }),
        None => Ok(()),
    }
}

#[derive(Clone)]
pub struct ProfileService {
    client: SnapshareClient,
    identity: Arc<dyn IdentityProvider>,
    uploader: Arc<dyn ImageUploader>,
    session: Session,
}

impl ProfileService {
    pub fn new(
        client: SnapshareClient,
        identity: Arc<dyn IdentityProvider>,
        uploader: Arc<dyn ImageUploader>,
        session: Session,
    ) -> Self {
        Self {
            client,
            identity,
            uploader,
            session,
        }
    }

    pub async fn get(&self, uid: &str) -> Result<Option<UserProfile>, AppError> {
        Ok(self.client.users().get(uid).await?)
    }

    pub async fn require(&self, uid: &str) -> Result<UserProfile, AppError> {
        self.get(uid).await?.ok_or_else(|| AppError::NotFound {
            what: "user",
            id: uid.to_string(),
        })
    }

    /// Saves the signed-in user's profile and marks it complete.
    ///
    /// Order: username check, avatar upload, profile write, identity update,
    /// session refresh. A failure stops the sequence where it happened.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<UserProfile, AppError> {
        let user = self.session.require_user()?;
        let username = update.username.trim().to_string();
        if username.is_empty() {
            return Err(AppError::UsernameRequired);
        }
        validate_username(&username)?;
        ensure_username_available(&self.client, &username, Some(user.uid())).await?;

        let photo_url = match update.avatar {
            Some(avatar) => Some(self.uploader.upload(avatar).await.inspect_err(|err| {
                error!("avatar upload for {} failed: {err}", user.uid());
            })?),
            None => None,
        };

        let current = self.get(user.uid()).await?;
        let exists = current.is_some();
        let base = current.unwrap_or_else(|| UserProfile {
            id: user.uid().to_string(),
            username: String::new(),
            display_name: String::new(),
            email: user.identity.email.clone(),
            bio: String::new(),
            photo_url: String::new(),
            followers: Vec::new(),
            following: Vec::new(),
            is_profile_complete: false,
        });
        let profile = UserProfile {
            username,
            display_name: update.display_name.trim().to_string(),
            bio: update.bio.trim().to_string(),
            photo_url: photo_url.clone().unwrap_or(base.photo_url.clone()),
            is_profile_complete: true,
            ..base
        };

        let users = self.client.users();
        let written = if exists {
            // Only the edited fields, so follower arrays written meanwhile survive.
            profile.validate()?;
            users
                .update(
                    &profile.id,
                    &[
                        FieldUpdate::set("username", profile.username.as_str()),
                        FieldUpdate::set("displayName", profile.display_name.as_str()),
                        FieldUpdate::set("bio", profile.bio.as_str()),
                        FieldUpdate::set("photoURL", profile.photo_url.as_str()),
                        FieldUpdate::set("isProfileComplete", true),
                    ],
                )
                .await
        } else {
            users.set(&profile).await
        };
        written.inspect_err(|err| error!("failed to save profile {}: {err}", profile.id))?;

        self.identity
            .update_profile(user.uid(), Some(&profile.display_name), photo_url.as_deref())
            .await
            .map_err(|source| AppError::Auth {
                action: "Failed to update profile".into(),
                source,
            })?;
        self.session.refresh(&self.client.users()).await;
        info!("profile {} updated", profile.id);
        Ok(profile)
    }
}
