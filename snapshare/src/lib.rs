//! Snapshare core library.
//!
//! Profiles, image posts, a follow graph, two-party chats and notifications over a
//! pluggable document store with live query subscriptions.

pub mod client;
pub mod config;
pub mod errors;
pub mod id;
pub mod identity;
pub mod keys;
pub mod live;
pub mod models;
pub mod routes;
pub mod services;
pub mod session;
pub mod store;
pub mod upload;
pub mod validators;

pub use client::{App, SnapshareClient};
pub use config::{AppConfig, ConfigError, StoreBackend};
pub use errors::*;
pub use identity::{Identity, IdentityProvider, MemoryIdentityProvider, SsoAssertion};
pub use live::LiveView;
pub use models::*;
pub use routes::{Route, RouteDecision};
pub use session::{CurrentUser, Session, SessionState};
pub use store::{Collection, Document, DocumentStore, FieldUpdate, MemoryStore, Query, RedisStore, SortOrder};
pub use upload::{CloudinaryUploader, ImageUpload, ImageUploader, MemoryUploader};

pub use redis;
