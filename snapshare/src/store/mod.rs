//! Document store abstraction.
//!
//! A store holds JSON documents in named collections (sub-collections are plain
//! paths such as `posts/{id}/comments`). Writes are single-document and
//! independent; there are no cross-document transactions. Live subscriptions push
//! the full matching result set whenever the queried collection changes.

mod collection;
mod memory;
mod query;
mod redis_store;
mod update;

use std::future::Future;

use async_trait::async_trait;
use futures::{StreamExt, stream::BoxStream};
use log::warn;
use serde_json::Value;
use tokio::{sync::mpsc, task::JoinHandle};

pub use collection::{Collection, Document, TypedSubscription};
pub use memory::MemoryStore;
pub use query::{Filter, FilterOperator, PREFIX_UPPER_BOUND, Query, SortOrder, compare_values, lookup};
pub use redis_store::RedisStore;
pub use update::{FieldUpdate, apply_updates};

use crate::errors::StoreError;

/// Full result set of a query at one point in time.
pub type Snapshot = Vec<Value>;

/// Change notice matching every collection, emitted when a backend may have missed events.
pub(crate) const ANY_COLLECTION: &str = "*";

const SUBSCRIPTION_BUFFER: usize = 16;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError>;

    /// Creates or overwrites a whole document.
    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError>;

    /// Applies field updates to an existing document; `NotFound` when it is missing.
    async fn update(&self, collection: &str, id: &str, updates: &[FieldUpdate]) -> Result<(), StoreError>;

    /// Deletes a document. Deleting a missing document succeeds.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn query(&self, query: &Query) -> Result<Snapshot, StoreError>;

    /// Opens a live subscription. The first push is the current result set.
    async fn subscribe(&self, query: Query) -> Result<Subscription, StoreError>;
}

/// Standing query pushing full snapshots. Dropping it stops the listener.
pub struct Subscription {
    receiver: mpsc::Receiver<Result<Snapshot, StoreError>>,
    task: JoinHandle<()>,
}

impl Subscription {
    /// Waits for the next snapshot. `None` once the listener has stopped.
    pub async fn next(&mut self) -> Option<Result<Snapshot, StoreError>> {
        self.receiver.recv().await
    }

    /// Returns a snapshot that is already waiting, without blocking.
    pub fn try_next(&mut self) -> Option<Result<Snapshot, StoreError>> {
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Runs a listener task: fetch, push when the result changed, wait for a change
/// notice naming the collection, repeat.
pub(crate) fn spawn_listener<F, Fut>(collection: String, mut changes: BoxStream<'static, String>, mut fetch: F) -> Subscription
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Snapshot, StoreError>> + Send + 'static,
{
    let (sender, receiver) = mpsc::channel(SUBSCRIPTION_BUFFER);
    let task = tokio::spawn(async move {
        let mut last: Option<Snapshot> = None;
        loop {
            match fetch().await {
                Ok(snapshot) => {
                    if last.as_ref() != Some(&snapshot) {
                        last = Some(snapshot.clone());
                        if sender.send(Ok(snapshot)).await.is_err() {
                            break;
                        }
                    }
                }
                Err(err) => {
                    warn!("subscription on '{collection}' failed to refresh: {err}");
                    if sender.send(Err(err)).await.is_err() {
                        break;
                    }
                }
            }

            if !wait_for_change(&mut changes, &collection).await {
                break;
            }
        }
    });
    Subscription { receiver, task }
}

async fn wait_for_change(changes: &mut BoxStream<'static, String>, collection: &str) -> bool {
    while let Some(changed) = changes.next().await {
        if changed == collection || changed == ANY_COLLECTION {
            return true;
        }
    }
    false
}
