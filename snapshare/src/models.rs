//! Entity records stored in the document store.
//!
//! Field names follow the camelCase document shape (`recipientId`, `photoURL`,
//! `unreadCounts`, ...). Timestamps are stored as epoch milliseconds so that
//! store-side ordering compares numbers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    errors::{ValidationError, ValidationIssue, ValidationResult},
    store::Document,
    validators::{is_valid_email, is_valid_url, validate_username},
};

/// Collection paths. Comments and messages live in per-parent sub-collections.
pub mod collections {
    pub const USERS: &str = "users";
    pub const POSTS: &str = "posts";
    pub const CHATS: &str = "chats";
    pub const NOTIFICATIONS: &str = "notifications";

    pub fn comments(post_id: &str) -> String {
        format!("{POSTS}/{post_id}/comments")
    }

    pub fn messages(chat_id: &str) -> String {
        format!("{CHATS}/{chat_id}/messages")
    }
}

/// Display fields copied from a profile at write time and never refreshed.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileSnapshot {
    #[serde(default)]
    pub username: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
}

fn default_true() -> bool {
    true
}

/// A user profile. The document id is the identity uid.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default, rename = "photoURL")]
    pub photo_url: String,
    /// Ids of users following this user.
    #[serde(default)]
    pub followers: Vec<String>,
    /// Ids of users this user follows.
    #[serde(default)]
    pub following: Vec<String>,
    /// Legacy documents without the flag count as complete.
    #[serde(default = "default_true")]
    pub is_profile_complete: bool,
}

impl UserProfile {
    /// Name shown in notification texts: display name, falling back to the username.
    pub fn display_label(&self) -> &str {
        if self.display_name.trim().is_empty() {
            &self.username
        } else {
            &self.display_name
        }
    }

    pub fn snapshot(&self) -> ProfileSnapshot {
        ProfileSnapshot {
            username: self.username.clone(),
            photo_url: self.photo_url.clone(),
        }
    }

    pub fn is_followed_by(&self, uid: &str) -> bool {
        self.followers.iter().any(|id| id == uid)
    }

    pub fn is_following(&self, uid: &str) -> bool {
        self.following.iter().any(|id| id == uid)
    }
}

impl Document for UserProfile {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> ValidationResult<()> {
        let mut issues = Vec::new();
        if let Err(err) = validate_username(&self.username) {
            issues.extend(err.issues);
        }
        if !self.email.is_empty() && !is_valid_email(&self.email) {
            issues.push(ValidationIssue::new("email", "validation.email", "invalid email address"));
        }
        if !self.photo_url.is_empty() && !is_valid_url(&self.photo_url) {
            issues.push(ValidationIssue::new("photoURL", "validation.url", "invalid avatar url"));
        }
        ValidationError::new(issues).into_result()
    }
}

/// An image post.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub user_id: String,
    pub image_url: String,
    #[serde(default)]
    pub caption: String,
    /// Ids of users who liked the post.
    #[serde(default)]
    pub likes: Vec<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Owner snapshot taken when the post was created.
    #[serde(default)]
    pub user: ProfileSnapshot,
}

impl Post {
    pub fn is_liked_by(&self, uid: &str) -> bool {
        self.likes.iter().any(|id| id == uid)
    }
}

impl Document for Post {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> ValidationResult<()> {
        if is_valid_url(&self.image_url) {
            Ok(())
        } else {
            Err(ValidationError::single("imageUrl", "validation.url", "invalid image url"))
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub user_id: String,
    /// Author snapshot.
    #[serde(default)]
    pub username: String,
    pub text: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Document for Comment {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> ValidationResult<()> {
        if self.text.trim().is_empty() {
            Err(ValidationError::single("text", "validation.required", "comment text is required"))
        } else {
            Ok(())
        }
    }
}

/// Preview of the latest message, embedded in the chat document.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LastMessage {
    pub text: String,
    pub sender_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

/// A two-party conversation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    pub participants: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_message: Option<LastMessage>,
    /// Participant id to unread message count.
    #[serde(default)]
    pub unread_counts: BTreeMap<String, u64>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,
}

impl Chat {
    pub fn has_participant(&self, uid: &str) -> bool {
        self.participants.iter().any(|id| id == uid)
    }

    /// The participant that is not `viewer`.
    pub fn other_participant(&self, viewer: &str) -> Option<&str> {
        self.participants.iter().map(String::as_str).find(|id| *id != viewer)
    }

    pub fn unread_for(&self, uid: &str) -> u64 {
        self.unread_counts.get(uid).copied().unwrap_or(0)
    }
}

impl Document for Chat {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> ValidationResult<()> {
        let distinct = match self.participants.as_slice() {
            [a, b] => a != b,
            _ => false,
        };
        if distinct {
            Ok(())
        } else {
            Err(ValidationError::single(
                "participants",
                "validation.participants",
                "a chat needs exactly two distinct participants",
            ))
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub text: String,
    #[serde(default)]
    pub read: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl Document for Message {
    fn id(&self) -> &str {
        &self.id
    }

    fn validate(&self) -> ValidationResult<()> {
        if self.text.trim().is_empty() {
            Err(ValidationError::single("text", "validation.required", "message text is required"))
        } else {
            Ok(())
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Comment,
    #[serde(other)]
    Other,
}

impl NotificationKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            NotificationKind::Follow => "follow",
            NotificationKind::Comment => "comment",
            NotificationKind::Other => "other",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub recipient_id: String,
    pub sender_id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_id: Option<String>,
    #[serde(default)]
    pub read: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
    /// Sender snapshot.
    #[serde(default)]
    pub sender: ProfileSnapshot,
}

impl Document for Notification {
    fn id(&self) -> &str {
        &self.id
    }
}
