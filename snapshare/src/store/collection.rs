use std::{marker::PhantomData, sync::Arc};

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use super::{DocumentStore, FieldUpdate, Query, Snapshot, Subscription};
use crate::errors::{StoreError, ValidationResult};

/// A typed record stored in a collection.
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    fn id(&self) -> &str;

    /// Checks field-level rules before a write.
    fn validate(&self) -> ValidationResult<()> {
        Ok(())
    }
}

/// Typed handle over one collection path of a [`DocumentStore`].
pub struct Collection<T: Document> {
    store: Arc<dyn DocumentStore>,
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> Clone for Collection<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            path: self.path.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Document> Collection<T> {
    pub fn new(store: Arc<dyn DocumentStore>, path: impl Into<String>) -> Self {
        Self {
            store,
            path: path.into(),
            _marker: PhantomData,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Starts a query scoped to this collection.
    pub fn query(&self) -> Query {
        Query::collection(self.path.clone())
    }

    pub async fn get(&self, id: &str) -> Result<Option<T>, StoreError> {
        match self.store.get(&self.path, id).await? {
            Some(value) => decode(&self.path, value).map(Some),
            None => Ok(None),
        }
    }

    pub async fn get_or_error(&self, id: &str) -> Result<T, StoreError> {
        self.get(id).await?.ok_or_else(|| StoreError::NotFound {
            collection: self.path.clone(),
            id: id.to_string(),
        })
    }

    /// Validates and writes the whole document under its own id.
    pub async fn set(&self, document: &T) -> Result<(), StoreError> {
        document.validate()?;
        let value = serde_json::to_value(document)?;
        self.store.set(&self.path, document.id(), value).await
    }

    pub async fn update(&self, id: &str, updates: &[FieldUpdate]) -> Result<(), StoreError> {
        self.store.update(&self.path, id, updates).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.store.delete(&self.path, id).await
    }

    pub async fn find_many(&self, query: &Query) -> Result<Vec<T>, StoreError> {
        let snapshot = self.store.query(query).await?;
        decode_all(&self.path, snapshot)
    }

    pub async fn find_first(&self, query: Query) -> Result<Option<T>, StoreError> {
        let snapshot = self.store.query(&query.limit(1)).await?;
        Ok(decode_all(&self.path, snapshot)?.into_iter().next())
    }

    pub async fn subscribe(&self, query: Query) -> Result<TypedSubscription<T>, StoreError> {
        let inner = self.store.subscribe(query).await?;
        Ok(TypedSubscription {
            inner,
            path: self.path.clone(),
            _marker: PhantomData,
        })
    }
}

/// Live subscription decoding each snapshot into `T`.
pub struct TypedSubscription<T: Document> {
    inner: Subscription,
    path: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Document> TypedSubscription<T> {
    pub async fn next(&mut self) -> Option<Result<Vec<T>, StoreError>> {
        let pushed = self.inner.next().await?;
        Some(pushed.and_then(|snapshot| decode_all(&self.path, snapshot)))
    }

    pub fn try_next(&mut self) -> Option<Result<Vec<T>, StoreError>> {
        let pushed = self.inner.try_next()?;
        Some(pushed.and_then(|snapshot| decode_all(&self.path, snapshot)))
    }
}

fn decode<T: Document>(collection: &str, value: Value) -> Result<T, StoreError> {
    let id = value
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    serde_json::from_value(value).map_err(|err| StoreError::Schema {
        collection: collection.to_string(),
        id,
        message: err.to_string(),
    })
}

fn decode_all<T: Document>(collection: &str, snapshot: Snapshot) -> Result<Vec<T>, StoreError> {
    snapshot.into_iter().map(|value| decode(collection, value)).collect()
}
