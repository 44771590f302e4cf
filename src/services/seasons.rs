// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lecture season administration.

use crate::db::{collections, decode_all, to_fields, Direction, Query, SharedStore, CREATED_AT};
use crate::error::{AppError, Result};
use crate::models::{Season, SeasonInput};
use crate::services::cache::PortalCache;
use validator::Validate;

#[derive(Clone)]
pub struct SeasonService {
    store: SharedStore,
    cache: PortalCache,
}

impl SeasonService {
    pub fn new(store: SharedStore, cache: PortalCache) -> Self {
        Self { store, cache }
    }

    /// Every season, newest first.
    pub async fn list_all(&self) -> Result<Vec<Season>> {
        let query = Query::new().order_by(CREATED_AT, Direction::Descending);
        let docs = self
            .store
            .query(collections::LECTURE_SEASONS, &query)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to list seasons"))?;
        decode_all(docs)
    }

    /// Seasons open for registration, newest first. Cached until the next
    /// season write.
    pub async fn list_active(&self) -> Result<Vec<Season>> {
        if let Some(seasons) = self.cache.active_seasons().await {
            return Ok(seasons);
        }

        let active: Vec<Season> = self
            .list_all()
            .await?
            .into_iter()
            .filter(|s| s.is_active)
            .collect();
        self.cache.set_active_seasons(active.clone()).await;
        Ok(active)
    }

    pub async fn get(&self, id: &str) -> Result<Season> {
        self.store
            .get(collections::LECTURE_SEASONS, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("season {id}")))?
            .decode()
    }

    pub async fn add(&self, input: SeasonInput) -> Result<Season> {
        let input = input.normalized();
        input.validate()?;

        let id = self
            .store
            .add(collections::LECTURE_SEASONS, to_fields(&input)?)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to add season"))?;
        self.cache.invalidate_seasons().await;
        tracing::info!(season_id = %id, name = %input.name, "Season added");
        self.get(&id).await
    }

    pub async fn update(&self, id: &str, input: SeasonInput) -> Result<Season> {
        let input = input.normalized();
        input.validate()?;

        self.store
            .update(collections::LECTURE_SEASONS, id, to_fields(&input)?)
            .await
            .inspect_err(|e| tracing::error!(season_id = id, error = %e, "Failed to update season"))?;
        self.cache.invalidate_seasons().await;
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store
            .delete(collections::LECTURE_SEASONS, id)
            .await
            .inspect_err(|e| tracing::error!(season_id = id, error = %e, "Failed to delete season"))?;
        self.cache.invalidate_seasons().await;
        tracing::info!(season_id = id, "Season deleted");
        Ok(())
    }
}
