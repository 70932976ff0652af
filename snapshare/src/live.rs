//! Live views: the client-side copy of a subscribed query.
//!
//! Every push replaces the held list wholesale; nothing is merged or patched.
//! A view can carry a client-side ordering applied after each replacement, for
//! queries that filter on one field but need to be shown ordered by another.

use std::cmp::Ordering;

use log::warn;

use crate::{
    errors::StoreError,
    store::{Document, TypedSubscription},
};

type SortFn<T> = Box<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

pub struct LiveView<T: Document> {
    subscription: Option<TypedSubscription<T>>,
    items: Vec<T>,
    revision: u64,
    sort: Option<SortFn<T>>,
}

impl<T: Document> LiveView<T> {
    pub fn new(subscription: TypedSubscription<T>) -> Self {
        Self {
            subscription: Some(subscription),
            items: Vec::new(),
            revision: 0,
            sort: None,
        }
    }

    /// Orders every received list with `compare` before storing it.
    pub fn sorted_by<F>(mut self, compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.sort = Some(Box::new(compare));
        self
    }

    /// Waits for the next push and replaces the held list.
    ///
    /// Returns `Ok(false)` once the view is closed or its listener has stopped.
    pub async fn refresh(&mut self) -> Result<bool, StoreError> {
        let Some(subscription) = self.subscription.as_mut() else {
            return Ok(false);
        };
        match subscription.next().await {
            Some(Ok(items)) => {
                self.replace(items);
                Ok(true)
            }
            Some(Err(err)) => Err(err),
            None => {
                self.subscription = None;
                Ok(false)
            }
        }
    }

    /// Applies every push already waiting, keeping only the latest one.
    /// Returns whether the held list changed.
    pub fn try_refresh(&mut self) -> bool {
        let Some(subscription) = self.subscription.as_mut() else {
            return false;
        };
        let mut latest = None;
        while let Some(pushed) = subscription.try_next() {
            match pushed {
                Ok(items) => latest = Some(items),
                Err(err) => warn!("live view skipped a failed refresh: {err}"),
            }
        }
        match latest {
            Some(items) => {
                self.replace(items);
                true
            }
            None => false,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    /// Number of pushes applied so far.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_open(&self) -> bool {
        self.subscription.is_some()
    }

    /// Stops listening. The last list stays readable.
    pub fn close(&mut self) {
        self.subscription = None;
    }

    pub fn into_items(self) -> Vec<T> {
        self.items
    }

    fn replace(&mut self, mut items: Vec<T>) {
        if let Some(compare) = &self.sort {
            items.sort_by(|a, b| compare(a, b));
        }
        self.items = items;
        self.revision += 1;
    }
}
