//! Entry points: typed collection accessors and the application facade.
//!
//! # Example
//! ```ignore
//! let app = App::in_memory();
//! let user = app.accounts().sign_up("a@example.com", "secret1", "alice", "Alice").await?;
//! let mut feed = app.feed().watch_home_feed().await?;
//! feed.refresh().await?;
//! ```

use std::sync::Arc;

use log::info;

use crate::{
    config::{AppConfig, StoreBackend},
    errors::AppError,
    identity::{IdentityProvider, MemoryIdentityProvider},
    models::{Chat, Comment, Message, Notification, Post, UserProfile, collections},
    services::{
        AccountService, ChatService, FeedService, NotificationService, PostService, ProfileService, SearchService,
        SocialGraphService,
    },
    session::Session,
    store::{Collection, DocumentStore, MemoryStore, RedisStore},
    upload::{CloudinaryUploader, ImageUploader, MemoryUploader},
};

/// Typed access to every collection of one document store.
#[derive(Clone)]
pub struct SnapshareClient {
    store: Arc<dyn DocumentStore>,
}

impl SnapshareClient {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn users(&self) -> Collection<UserProfile> {
        Collection::new(self.store.clone(), collections::USERS)
    }

    pub fn posts(&self) -> Collection<Post> {
        Collection::new(self.store.clone(), collections::POSTS)
    }

    pub fn comments(&self, post_id: &str) -> Collection<Comment> {
        Collection::new(self.store.clone(), collections::comments(post_id))
    }

    pub fn chats(&self) -> Collection<Chat> {
        Collection::new(self.store.clone(), collections::CHATS)
    }

    pub fn messages(&self, chat_id: &str) -> Collection<Message> {
        Collection::new(self.store.clone(), collections::messages(chat_id))
    }

    pub fn notifications(&self) -> Collection<Notification> {
        Collection::new(self.store.clone(), collections::NOTIFICATIONS)
    }
}

/// Wires the store, identity provider, uploader and session together and
/// hands out services bound to them.
#[derive(Clone)]
pub struct App {
    client: SnapshareClient,
    identity: Arc<dyn IdentityProvider>,
    uploader: Arc<dyn ImageUploader>,
    session: Session,
}

impl App {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityProvider>,
        uploader: Arc<dyn ImageUploader>,
    ) -> Self {
        Self {
            client: SnapshareClient::new(store),
            identity,
            uploader,
            session: Session::signed_out(),
        }
    }

    /// Everything in process: memory store, memory identities, memory uploads.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryIdentityProvider::new()),
            Arc::new(MemoryUploader::new()),
        )
    }

    /// Builds the app from configuration, connecting to Redis when selected.
    pub async fn from_config(config: &AppConfig) -> Result<Self, AppError> {
        let store: Arc<dyn DocumentStore> = match config.store.backend {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Redis => {
                let url = config.redis_url()?;
                let store = RedisStore::connect(url, config.store.prefix.clone()).await?;
                info!("connected to redis store with prefix '{}'", store.prefix());
                Arc::new(store)
            }
        };
        Ok(Self::new(
            store,
            Arc::new(MemoryIdentityProvider::new()),
            Arc::new(CloudinaryUploader::new(&config.upload)),
        ))
    }

    pub fn client(&self) -> &SnapshareClient {
        &self.client
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }

    pub fn accounts(&self) -> AccountService {
        AccountService::new(self.client.clone(), self.identity.clone(), self.session.clone())
    }

    pub fn profiles(&self) -> ProfileService {
        ProfileService::new(
            self.client.clone(),
            self.identity.clone(),
            self.uploader.clone(),
            self.session.clone(),
        )
    }

    pub fn graph(&self) -> SocialGraphService {
        SocialGraphService::new(self.client.clone())
    }

    pub fn posts(&self) -> PostService {
        PostService::new(self.client.clone(), self.uploader.clone())
    }

    pub fn feed(&self) -> FeedService {
        FeedService::new(self.client.clone())
    }

    pub fn chat(&self) -> ChatService {
        ChatService::new(self.client.clone())
    }

    pub fn notifications(&self) -> NotificationService {
        NotificationService::new(self.client.clone())
    }

    pub fn search(&self) -> SearchService {
        SearchService::new(self.client.clone())
    }
}
