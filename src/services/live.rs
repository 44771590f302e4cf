// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Typed live queries.
//!
//! A [`LiveQuery`] reads a collection either once or continuously. The
//! continuous form is also available as a [`LiveStream`], which owns its
//! subscription and releases it when the stream is dropped (for example
//! when an SSE client disconnects).

use crate::db::{decode_all, ChangeHandler, Query, SharedStore, StoredDocument, Subscription};
use crate::error::Result;
use futures_util::Stream;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// A query over one collection, decoded into `T`.
pub struct LiveQuery<T> {
    store: SharedStore,
    collection: &'static str,
    query: Query,
    _marker: PhantomData<fn() -> T>,
}

impl<T> LiveQuery<T>
where
    T: DeserializeOwned + Send + 'static,
{
    pub fn new(store: SharedStore, collection: &'static str, query: Query) -> Self {
        Self {
            store,
            collection,
            query,
            _marker: PhantomData,
        }
    }

    /// Read the current result once.
    pub async fn fetch_once(&self) -> Result<Vec<T>> {
        let docs = self.store.query(self.collection, &self.query).await?;
        decode_all(docs)
    }

    /// Call `on_change` with the current result and then with every change,
    /// until the returned subscription is released.
    pub fn subscribe<F>(&self, on_change: F) -> Result<Subscription>
    where
        F: Fn(Result<Vec<T>>) + Send + Sync + 'static,
    {
        let handler: ChangeHandler = Arc::new(move |snapshot: Result<Vec<StoredDocument>>| {
            on_change(snapshot.and_then(decode_all));
        });
        self.store
            .subscribe(self.collection, self.query.clone(), handler)
    }

    /// Subscribe and expose the snapshots as a stream.
    pub fn into_stream(self) -> Result<LiveStream<T>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let collection = self.collection;
        let subscription = self.subscribe(move |snapshot| {
            if tx.send(snapshot).is_err() {
                tracing::debug!(collection, "Live stream receiver gone");
            }
        })?;

        Ok(LiveStream {
            rx,
            _subscription: subscription,
        })
    }
}

/// Snapshot stream backed by a subscription. Dropping it unsubscribes.
pub struct LiveStream<T> {
    rx: mpsc::UnboundedReceiver<Result<Vec<T>>>,
    _subscription: Subscription,
}

impl<T> Stream for LiveStream<T> {
    type Item = Result<Vec<T>>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
