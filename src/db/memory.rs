// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process document store.
//!
//! Backs the test suite and `STORE_BACKEND=memory` deployments. Listeners
//! are push-based: every write to a collection re-runs the affected
//! subscribed queries and delivers fresh snapshots.

use super::{
    generate_document_id, stamp_new, stamp_update, ChangeHandler, DocumentStore, Fields, Query,
    StoredDocument, Subscription,
};
use crate::error::AppError;
use crate::time_utils::Timestamp;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

struct Listener {
    collection: String,
    query: Query,
    on_change: ChangeHandler,
}

/// In-memory store. Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    collections: Arc<DashMap<String, BTreeMap<String, Fields>>>,
    listeners: Arc<DashMap<u64, Listener>>,
    next_listener_id: Arc<AtomicU64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Insert a document verbatim, without stamping timestamps.
    ///
    /// Lets tests seed legacy records whose timestamps came from other writers.
    pub fn insert_raw(&self, collection: &str, id: &str, fields: Fields) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        self.notify(collection);
    }

    fn snapshot(&self, collection: &str, query: &Query) -> Vec<StoredDocument> {
        let docs: Vec<StoredDocument> = match self.collections.get(collection) {
            Some(col) => col
                .iter()
                .map(|(id, fields)| StoredDocument {
                    id: id.clone(),
                    fields: fields.clone(),
                })
                .collect(),
            None => Vec::new(),
        };
        query.apply(docs)
    }

    /// Deliver fresh snapshots to listeners on `collection`.
    ///
    /// Handlers are collected before being invoked so no map lock is held
    /// while user code runs.
    fn notify(&self, collection: &str) {
        let targets: Vec<(Query, ChangeHandler)> = self
            .listeners
            .iter()
            .filter(|entry| entry.collection == collection)
            .map(|entry| (entry.query.clone(), entry.on_change.clone()))
            .collect();

        for (query, on_change) in targets {
            on_change(Ok(self.snapshot(collection, &query)));
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, AppError> {
        let id = generate_document_id()?;
        self.create(collection, &id, fields).await?;
        Ok(id)
    }

    async fn create(&self, collection: &str, id: &str, mut fields: Fields) -> Result<(), AppError> {
        stamp_new(&mut fields, Timestamp::now());
        {
            let mut col = self.collections.entry(collection.to_string()).or_default();
            if col.contains_key(id) {
                return Err(AppError::Conflict(format!("{}/{}", collection, id)));
            }
            col.insert(id.to_string(), fields);
        }
        self.notify(collection);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, AppError> {
        Ok(self.collections.get(collection).and_then(|col| {
            col.get(id).map(|fields| StoredDocument {
                id: id.to_string(),
                fields: fields.clone(),
            })
        }))
    }

    async fn update(&self, collection: &str, id: &str, mut fields: Fields) -> Result<(), AppError> {
        stamp_update(&mut fields, Timestamp::now());
        {
            let mut col = self
                .collections
                .get_mut(collection)
                .ok_or_else(|| AppError::NotFound(format!("{}/{}", collection, id)))?;
            let existing = col
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(format!("{}/{}", collection, id)))?;
            existing.extend(fields);
        }
        self.notify(collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        let removed = self
            .collections
            .get_mut(collection)
            .and_then(|mut col| col.remove(id))
            .is_some();
        if removed {
            self.notify(collection);
        }
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<StoredDocument>, AppError> {
        Ok(self.snapshot(collection, query))
    }

    fn subscribe(
        &self,
        collection: &str,
        query: Query,
        on_change: ChangeHandler,
    ) -> Result<Subscription, AppError> {
        let id = self.next_listener_id.fetch_add(1, Ordering::Relaxed);

        on_change(Ok(self.snapshot(collection, &query)));
        self.listeners.insert(
            id,
            Listener {
                collection: collection.to_string(),
                query,
                on_change,
            },
        );
        tracing::debug!(collection, listener = id, "Subscribed");

        let listeners = self.listeners.clone();
        Ok(Subscription::new(move || {
            listeners.remove(&id);
            tracing::debug!(listener = id, "Unsubscribed");
        }))
    }
}
