use std::{
    collections::BTreeMap,
    sync::{Arc, PoisonError, RwLock},
};

use async_trait::async_trait;
use futures::StreamExt;
use log::debug;
use serde_json::Value;
use tokio::sync::broadcast::{self, error::RecvError};

use super::{ANY_COLLECTION, DocumentStore, FieldUpdate, Query, Snapshot, Subscription, apply_updates, spawn_listener};
use crate::errors::StoreError;

const CHANGE_CHANNEL_CAPACITY: usize = 256;

type Collections = BTreeMap<String, BTreeMap<String, Value>>;

/// In-process document store. Clones share the same data.
///
/// Documents are kept per collection in id order; every write broadcasts the
/// collection path to live subscriptions.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    collections: RwLock<Collections>,
    changes: broadcast::Sender<String>,
}

impl MemoryInner {
    fn run_query(&self, query: &Query) -> Snapshot {
        let collections = self.collections.read().unwrap_or_else(PoisonError::into_inner);
        match collections.get(&query.collection) {
            Some(documents) => query.apply(documents.values().cloned()),
            None => Vec::new(),
        }
    }

    fn notify(&self, collection: &str) {
        // No receivers just means nobody is listening.
        let _ = self.changes.send(collection.to_string());
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            inner: Arc::new(MemoryInner {
                collections: RwLock::new(BTreeMap::new()),
                changes,
            }),
        }
    }

    /// Number of documents in a collection.
    pub fn len(&self, collection: &str) -> usize {
        let collections = self.inner.collections.read().unwrap_or_else(PoisonError::into_inner);
        collections.get(collection).map_or(0, BTreeMap::len)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let collections = self.inner.collections.read().unwrap_or_else(PoisonError::into_inner);
        Ok(collections.get(collection).and_then(|documents| documents.get(id)).cloned())
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        if !document.is_object() {
            return Err(StoreError::Other {
                message: format!("document {collection}/{id} must be a JSON object").into(),
            });
        }
        {
            let mut collections = self.inner.collections.write().unwrap_or_else(PoisonError::into_inner);
            collections
                .entry(collection.to_string())
                .or_default()
                .insert(id.to_string(), document);
        }
        debug!("set {collection}/{id}");
        self.inner.notify(collection);
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, updates: &[FieldUpdate]) -> Result<(), StoreError> {
        {
            let mut collections = self.inner.collections.write().unwrap_or_else(PoisonError::into_inner);
            let document = collections
                .get_mut(collection)
                .and_then(|documents| documents.get_mut(id))
                .ok_or_else(|| StoreError::NotFound {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })?;
            let mut updated = document.clone();
            apply_updates(&mut updated, updates)?;
            *document = updated;
        }
        debug!(
            "update {collection}/{id} fields={:?}",
            updates.iter().map(FieldUpdate::field).collect::<Vec<_>>()
        );
        self.inner.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let removed = {
            let mut collections = self.inner.collections.write().unwrap_or_else(PoisonError::into_inner);
            collections
                .get_mut(collection)
                .and_then(|documents| documents.remove(id))
                .is_some()
        };
        if removed {
            debug!("delete {collection}/{id}");
            self.inner.notify(collection);
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Snapshot, StoreError> {
        Ok(self.inner.run_query(query))
    }

    async fn subscribe(&self, query: Query) -> Result<Subscription, StoreError> {
        // Subscribe before the first fetch so no write slips between them.
        let receiver = self.inner.changes.subscribe();
        let changes = futures::stream::unfold(receiver, |mut receiver| async move {
            match receiver.recv().await {
                Ok(collection) => Some((collection, receiver)),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("memory subscription lagged by {skipped} change notices");
                    Some((ANY_COLLECTION.to_string(), receiver))
                }
                Err(RecvError::Closed) => None,
            }
        })
        .boxed();

        let inner = Arc::clone(&self.inner);
        let collection = query.collection.clone();
        Ok(spawn_listener(collection, changes, move || {
            let snapshot = inner.run_query(&query);
            async move { Ok(snapshot) }
        }))
    }
}
