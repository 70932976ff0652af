//! Follow relationships.
//!
//! An edge is stored twice: the follower's id in the followee's `followers`
//! array and the followee's id in the follower's `following` array. The two
//! writes are independent, so an interrupted follow leaves the edge one-sided.
//! [`SocialGraphService::audit`] finds such edges and
//! [`SocialGraphService::repair`] completes them.

use std::collections::BTreeMap;

use log::{error, info, warn};

use crate::{
    client::SnapshareClient,
    errors::AppError,
    models::{NotificationKind, UserProfile},
    store::FieldUpdate,
};

use super::notifications::NotificationService;

/// Which half of an edge is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingSide {
    /// `followee.followers` lacks the follower.
    Followers,
    /// `follower.following` lacks the followee.
    Following,
}

/// A follow edge recorded on one side only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphAsymmetry {
    pub follower: String,
    pub followee: String,
    pub missing: MissingSide,
}

/// Outcome of one repair attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRepair {
    pub asymmetry: GraphAsymmetry,
    pub repaired: bool,
}

#[derive(Clone)]
pub struct SocialGraphService {
    client: SnapshareClient,
}

impl SocialGraphService {
    pub fn new(client: SnapshareClient) -> Self {
        Self { client }
    }

    /// `actor` follows `target`: target's followers first, then actor's following,
    /// then a notification to the target when they are different users.
    /// An unknown actor fails before either array is touched.
    pub async fn follow(&self, actor: &str, target: &str) -> Result<(), AppError> {
        let sender = self.require(actor).await?;
        let users = self.client.users();

        users
            .update(target, &[FieldUpdate::array_union("followers", actor)])
            .await
            .inspect_err(|err| error!("follow {actor} -> {target}: followers write failed: {err}"))?;
        users
            .update(actor, &[FieldUpdate::array_union("following", target)])
            .await
            .inspect_err(|err| {
                error!("follow {actor} -> {target}: following write failed, edge is one-sided: {err}")
            })?;

        if actor != target {
            let message = format!("{} started following you", sender.display_label());
            NotificationService::new(self.client.clone())
                .create(target, &sender, NotificationKind::Follow, message, None)
                .await?;
        }
        info!("{actor} followed {target}");
        Ok(())
    }

    pub async fn unfollow(&self, actor: &str, target: &str) -> Result<(), AppError> {
        let users = self.client.users();
        users
            .update(target, &[FieldUpdate::array_remove("followers", actor)])
            .await
            .inspect_err(|err| error!("unfollow {actor} -> {target}: followers write failed: {err}"))?;
        users
            .update(actor, &[FieldUpdate::array_remove("following", target)])
            .await
            .inspect_err(|err| {
                error!("unfollow {actor} -> {target}: following write failed, edge is one-sided: {err}")
            })?;
        info!("{actor} unfollowed {target}");
        Ok(())
    }

    /// Follows or unfollows depending on the target's current `followers`.
    /// Returns whether `actor` follows `target` afterwards.
    pub async fn toggle_follow(&self, actor: &str, target: &str) -> Result<bool, AppError> {
        if self.is_following(actor, target).await? {
            self.unfollow(actor, target).await?;
            Ok(false)
        } else {
            self.follow(actor, target).await?;
            Ok(true)
        }
    }

    /// Reads the target's `followers`; this is the side follow writes first.
    pub async fn is_following(&self, actor: &str, target: &str) -> Result<bool, AppError> {
        let target_profile = self.require(target).await?;
        Ok(target_profile.is_followed_by(actor))
    }

    pub async fn followers(&self, uid: &str) -> Result<Vec<UserProfile>, AppError> {
        let profile = self.require(uid).await?;
        self.resolve(&profile.followers).await
    }

    pub async fn following(&self, uid: &str) -> Result<Vec<UserProfile>, AppError> {
        let profile = self.require(uid).await?;
        self.resolve(&profile.following).await
    }

    async fn require(&self, uid: &str) -> Result<UserProfile, AppError> {
        self.client.users().get(uid).await?.ok_or_else(|| AppError::NotFound {
            what: "user",
            id: uid.to_string(),
        })
    }

    /// Loads profiles for `ids` in order, skipping ids without a profile.
    async fn resolve(&self, ids: &[String]) -> Result<Vec<UserProfile>, AppError> {
        let users = self.client.users();
        let mut profiles = Vec::with_capacity(ids.len());
        for id in ids {
            match users.get(id).await? {
                Some(profile) => profiles.push(profile),
                None => warn!("dangling user reference {id}"),
            }
        }
        Ok(profiles)
    }

    /// Scans every profile for edges present on only one side.
    pub async fn audit(&self) -> Result<Vec<GraphAsymmetry>, AppError> {
        let users = self.client.users();
        let profiles: BTreeMap<String, UserProfile> = users
            .find_many(&users.query())
            .await?
            .into_iter()
            .map(|profile| (profile.id.clone(), profile))
            .collect();

        let mut found = Vec::new();
        for profile in profiles.values() {
            for followee in &profile.following {
                if let Some(other) = profiles.get(followee) {
                    if !other.is_followed_by(&profile.id) {
                        found.push(GraphAsymmetry {
                            follower: profile.id.clone(),
                            followee: followee.clone(),
                            missing: MissingSide::Followers,
                        });
                    }
                }
            }
            for follower in &profile.followers {
                if let Some(other) = profiles.get(follower) {
                    if !other.is_following(&profile.id) {
                        found.push(GraphAsymmetry {
                            follower: follower.clone(),
                            followee: profile.id.clone(),
                            missing: MissingSide::Following,
                        });
                    }
                }
            }
        }
        Ok(found)
    }

    /// Writes the missing half of every one-sided edge. Failures are reported
    /// per edge and do not stop the pass.
    pub async fn repair(&self) -> Result<Vec<EdgeRepair>, AppError> {
        let users = self.client.users();
        let mut results = Vec::new();
        for asymmetry in self.audit().await? {
            let write = match asymmetry.missing {
                MissingSide::Followers => {
                    users
                        .update(
                            &asymmetry.followee,
                            &[FieldUpdate::array_union("followers", asymmetry.follower.as_str())],
                        )
                        .await
                }
                MissingSide::Following => {
                    users
                        .update(
                            &asymmetry.follower,
                            &[FieldUpdate::array_union("following", asymmetry.followee.as_str())],
                        )
                        .await
                }
            };
            let repaired = match write {
                Ok(()) => true,
                Err(err) => {
                    error!(
                        "repair of {} -> {} failed: {err}",
                        asymmetry.follower, asymmetry.followee
                    );
                    false
                }
            };
            results.push(EdgeRepair { asymmetry, repaired });
        }
        info!("graph repair touched {} edges", results.len());
        Ok(results)
    }
}
