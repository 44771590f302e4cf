// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notice board: the student feed and the admin table.

use crate::db::{collections, decode_all, to_fields, Query, SharedStore};
use crate::error::{AppError, Result};
use crate::models::notice::{admin_table, student_feed};
use crate::models::{Notice, NoticeInput, NoticeRow};
use crate::services::profiles::ProfileService;
use crate::services::seasons::SeasonService;
use validator::Validate;

#[derive(Clone)]
pub struct NoticeService {
    store: SharedStore,
    profiles: ProfileService,
    seasons: SeasonService,
}

impl NoticeService {
    pub fn new(store: SharedStore, profiles: ProfileService, seasons: SeasonService) -> Self {
        Self {
            store,
            profiles,
            seasons,
        }
    }

    async fn list_all(&self) -> Result<Vec<Notice>> {
        let docs = self
            .store
            .query(collections::NOTICES, &Query::new())
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to list notices"))?;
        decode_all(docs)
    }

    /// Published notices for the student's season. Empty until the student
    /// has picked a season.
    pub async fn for_student(&self, owner_id: &str) -> Result<Vec<Notice>> {
        let season_id = self
            .profiles
            .get_profile(owner_id)
            .await?
            .and_then(|p| p.season_id)
            .unwrap_or_default();
        if season_id.is_empty() {
            return Ok(Vec::new());
        }

        let query = Query::new().where_eq("seasonId", season_id.as_str());
        let docs = self.store.query(collections::NOTICES, &query).await?;
        Ok(student_feed(decode_all(docs)?, &season_id))
    }

    /// All notices with season labels, for the admin table.
    pub async fn table(&self) -> Result<Vec<NoticeRow>> {
        let (notices, seasons) = tokio::try_join!(self.list_all(), self.seasons.list_all())?;
        Ok(admin_table(notices, &seasons))
    }

    pub async fn get(&self, id: &str) -> Result<Notice> {
        self.store
            .get(collections::NOTICES, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("notice {id}")))?
            .decode()
    }

    pub async fn add(&self, input: NoticeInput) -> Result<Notice> {
        input.validate()?;
        let id = self
            .store
            .add(collections::NOTICES, to_fields(&input)?)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to add notice"))?;
        tracing::info!(notice_id = %id, season_id = %input.season_id, "Notice added");
        self.get(&id).await
    }

    pub async fn update(&self, id: &str, input: NoticeInput) -> Result<Notice> {
        input.validate()?;
        self.store
            .update(collections::NOTICES, id, to_fields(&input)?)
            .await
            .inspect_err(|e| tracing::error!(notice_id = id, error = %e, "Failed to update notice"))?;
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store
            .delete(collections::NOTICES, id)
            .await
            .inspect_err(|e| tracing::error!(notice_id = id, error = %e, "Failed to delete notice"))?;
        tracing::info!(notice_id = id, "Notice deleted");
        Ok(())
    }
}
