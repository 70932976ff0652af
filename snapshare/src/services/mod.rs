//! Application workflows. Each service is a cheap handle over the shared client;
//! multi-document workflows issue their writes one after another with no
//! transaction around them.

mod accounts;
mod chat;
mod feed;
mod notifications;
mod posts;
mod profiles;
mod search;
mod social_graph;

pub use accounts::AccountService;
pub use chat::{ChatService, ChatSummary, FALLBACK_USERNAME, SUGGESTION_LIMIT};
pub use feed::FeedService;
pub use notifications::NotificationService;
pub use posts::{NewPost, PostService};
pub use profiles::{ProfileService, ProfileUpdate, ensure_username_available};
pub use search::SearchService;
pub use social_graph::{EdgeRepair, GraphAsymmetry, MissingSide, SocialGraphService};

use chrono::{DateTime, SubsecRound, Utc};

/// Current time at the millisecond precision documents are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}
