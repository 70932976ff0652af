use async_trait::async_trait;
use futures::StreamExt;
use log::{debug, warn};
use redis::{AsyncCommands, aio::ConnectionManager, cmd};
use serde_json::Value;

use super::{DocumentStore, FieldUpdate, Query, Snapshot, Subscription, apply_updates, spawn_listener};
use crate::{errors::StoreError, keys::KeyContext};

/// Document store backed by plain Redis strings.
///
/// Each document is a JSON string at `{prefix}:doc:{collection}:{id}`; the ids of
/// a collection are kept in the set `{prefix}:idx:{collection}`. Every write
/// publishes the collection path on `{prefix}:changes`, which drives live
/// subscriptions across processes.
///
/// Field updates read the document, apply the changes locally and write it back.
/// Two writers updating the same document concurrently may lose one update.
#[derive(Clone)]
pub struct RedisStore {
    client: redis::Client,
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStore {
    pub fn new(client: redis::Client, conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            client,
            conn,
            prefix: prefix.into(),
        }
    }

    /// Opens a managed connection to `url`.
    pub async fn connect(url: &str, prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client.clone()).await?;
        Ok(Self::new(client, conn, prefix))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn keys(&self) -> KeyContext<'_> {
        KeyContext::new(&self.prefix)
    }

    async fn write(&self, collection: &str, id: &str, document: &Value) -> Result<(), StoreError> {
        let keys = self.keys();
        let json = serde_json::to_string(document)?;
        let mut conn = self.conn.clone();
        redis::pipe()
            .atomic()
            .cmd("SET")
            .arg(keys.document(collection, id))
            .arg(json)
            .ignore()
            .cmd("SADD")
            .arg(keys.index(collection))
            .arg(id)
            .ignore()
            .cmd("PUBLISH")
            .arg(keys.changes_channel())
            .arg(collection)
            .ignore()
            .query_async::<()>(&mut conn)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Value>, StoreError> {
        let mut conn = self.conn.clone();
        let raw: Option<String> = conn.get(self.keys().document(collection, id)).await?;
        match raw {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn set(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        if !document.is_object() {
            return Err(StoreError::Other {
                message: format!("document {collection}/{id} must be a JSON object").into(),
            });
        }
        self.write(collection, id, &document).await?;
        debug!("set {collection}/{id}");
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, updates: &[FieldUpdate]) -> Result<(), StoreError> {
        let mut document = self.get(collection, id).await?.ok_or_else(|| StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        })?;
        apply_updates(&mut document, updates)?;
        self.write(collection, id, &document).await?;
        debug!(
            "update {collection}/{id} fields={:?}",
            updates.iter().map(FieldUpdate::field).collect::<Vec<_>>()
        );
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let keys = self.keys();
        let mut conn = self.conn.clone();
        let (removed,): (i64,) = redis::pipe()
            .atomic()
            .cmd("DEL")
            .arg(keys.document(collection, id))
            .cmd("SREM")
            .arg(keys.index(collection))
            .arg(id)
            .ignore()
            .query_async(&mut conn)
            .await?;
        if removed > 0 {
            let _: i64 = conn.publish(keys.changes_channel(), collection).await?;
            debug!("delete {collection}/{id}");
        }
        Ok(())
    }

    async fn query(&self, query: &Query) -> Result<Snapshot, StoreError> {
        run_query(self.conn.clone(), self.prefix.clone(), query).await
    }

    async fn subscribe(&self, query: Query) -> Result<Subscription, StoreError> {
        // Subscribe before the first fetch so no write slips between them.
        let mut pubsub = self.client.get_async_pubsub().await?;
        pubsub.subscribe(self.keys().changes_channel()).await?;
        let changes = pubsub
            .into_on_message()
            .filter_map(|message| async move {
                match message.get_payload::<String>() {
                    Ok(collection) => Some(collection),
                    Err(err) => {
                        warn!("ignoring malformed change notice: {err}");
                        None
                    }
                }
            })
            .boxed();

        let conn = self.conn.clone();
        let prefix = self.prefix.clone();
        let collection = query.collection.clone();
        Ok(spawn_listener(collection, changes, move || {
            let conn = conn.clone();
            let prefix = prefix.clone();
            let query = query.clone();
            async move { run_query(conn, prefix, &query).await }
        }))
    }
}

async fn run_query(mut conn: ConnectionManager, prefix: String, query: &Query) -> Result<Snapshot, StoreError> {
    let keys = KeyContext::new(&prefix);
    let mut ids: Vec<String> = conn.smembers(keys.index(&query.collection)).await?;
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    ids.sort();

    let document_keys: Vec<String> = ids
        .iter()
        .map(|id| keys.document(&query.collection, id))
        .collect();
    let raw: Vec<Option<String>> = cmd("MGET").arg(&document_keys).query_async(&mut conn).await?;

    let mut documents = Vec::with_capacity(raw.len());
    for (id, json) in ids.iter().zip(raw) {
        // An id without a document is left over from an interrupted delete.
        let Some(json) = json else {
            debug!("index entry {}/{id} has no document", query.collection);
            continue;
        };
        documents.push(serde_json::from_str::<Value>(&json)?);
    }
    Ok(query.apply(documents))
}
