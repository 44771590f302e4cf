// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Advisory in-process caches.
//!
//! Entries are filled on read and dropped after writes that could change
//! them. Nothing here is authoritative; a cold cache only costs a store read.

use crate::models::{Season, UserProfile};
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Shared cache handle. Clones share the same entries.
#[derive(Clone, Default)]
pub struct PortalCache {
    profiles: Arc<DashMap<String, UserProfile>>,
    active_seasons: Arc<RwLock<Option<Vec<Season>>>>,
}

impl PortalCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn profile(&self, owner_id: &str) -> Option<UserProfile> {
        self.profiles.get(owner_id).map(|p| p.clone())
    }

    pub fn insert_profile(&self, owner_id: &str, profile: UserProfile) {
        self.profiles.insert(owner_id.to_string(), profile);
    }

    pub fn invalidate_profile(&self, owner_id: &str) {
        if self.profiles.remove(owner_id).is_some() {
            tracing::debug!(owner_id, "Profile cache entry invalidated");
        }
    }

    pub async fn active_seasons(&self) -> Option<Vec<Season>> {
        self.active_seasons.read().await.clone()
    }

    pub async fn set_active_seasons(&self, seasons: Vec<Season>) {
        *self.active_seasons.write().await = Some(seasons);
    }

    pub async fn invalidate_seasons(&self) {
        *self.active_seasons.write().await = None;
    }
}

impl std::fmt::Debug for PortalCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PortalCache")
            .field("profiles", &self.profiles.len())
            .finish_non_exhaustive()
    }
}
