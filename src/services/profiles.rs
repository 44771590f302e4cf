// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Student profile orchestration.
//!
//! Reads go through the profile cache. Every write follows the same shape:
//! confirm the profile exists, write, invalidate the cache entry, then reload
//! from the store so callers always see what was actually persisted.

use crate::db::{collections, to_fields, Query, SharedStore};
use crate::error::{AppError, Result};
use crate::models::profile::{resolve_newest_created, NewProfile};
use crate::models::{
    users_in_season, InitialProfileFields, ProfileUpdate, Reflection, Season, SurveyAnswers,
    UserProfile,
};
use crate::services::cache::PortalCache;
use crate::services::live::LiveQuery;
use crate::services::seasons::SeasonService;
use validator::Validate;

#[derive(Clone)]
pub struct ProfileService {
    store: SharedStore,
    cache: PortalCache,
}

impl ProfileService {
    pub fn new(store: SharedStore, cache: PortalCache) -> Self {
        Self { store, cache }
    }

    /// Profile for an owner, served from cache when possible.
    pub async fn get_profile(&self, owner_id: &str) -> Result<Option<UserProfile>> {
        if let Some(profile) = self.cache.profile(owner_id) {
            return Ok(Some(profile));
        }

        let profile = self.load_profile(owner_id).await?;
        if let Some(profile) = &profile {
            self.cache.insert_profile(owner_id, profile.clone());
        }
        Ok(profile)
    }

    /// Read straight from the store, bypassing the cache.
    async fn load_profile(&self, owner_id: &str) -> Result<Option<UserProfile>> {
        let query = Query::new().where_eq("uid", owner_id);
        let profiles: Vec<UserProfile> = self
            .store
            .query(collections::USER_INFO, &query)
            .await
            .and_then(crate::db::decode_all)
            .inspect_err(|e| tracing::error!(owner_id, error = %e, "Failed to load profile"))?;

        if profiles.len() > 1 {
            tracing::warn!(owner_id, count = profiles.len(), "Duplicate profiles for owner");
        }
        Ok(resolve_newest_created(&profiles, owner_id).cloned())
    }

    /// Apply a partial update and return the reloaded profile.
    ///
    /// Fails with `NotFound` and writes nothing if the owner has no profile.
    pub async fn update_profile(&self, owner_id: &str, update: ProfileUpdate) -> Result<UserProfile> {
        let current = self.load_profile(owner_id).await?.ok_or_else(|| {
            tracing::warn!(owner_id, "Profile update for missing profile");
            AppError::NotFound(format!("profile for {owner_id}"))
        })?;

        let fields = to_fields(&update)?;
        self.store
            .update(collections::USER_INFO, &current.id, fields)
            .await
            .inspect_err(|e| tracing::error!(owner_id, error = %e, "Profile update failed"))?;
        self.cache.invalidate_profile(owner_id);

        let reloaded = self.load_profile(owner_id).await?.ok_or_else(|| {
            tracing::error!(owner_id, "Profile vanished after update");
            AppError::NotFound(format!("profile for {owner_id}"))
        })?;
        self.cache.insert_profile(owner_id, reloaded.clone());
        tracing::info!(owner_id, "Profile updated");
        Ok(reloaded)
    }

    /// Create the owner's profile. Fails with `Conflict` if one exists.
    ///
    /// The record is keyed by owner id so two concurrent creates cannot
    /// both succeed.
    pub async fn create_profile(
        &self,
        owner_id: &str,
        email: &str,
        season_id: Option<&str>,
        initial: InitialProfileFields,
    ) -> Result<UserProfile> {
        if self.load_profile(owner_id).await?.is_some() {
            return Err(AppError::Conflict(format!("profile for {owner_id}")));
        }

        let record = NewProfile {
            uid: owner_id,
            email,
            season_id,
            last_name: initial.last_name,
            first_name: initial.first_name,
            last_name_kana: initial.last_name_kana,
            first_name_kana: initial.first_name_kana,
            typing_skill_level: initial.typing_skill_level,
        };
        self.store
            .create(collections::USER_INFO, owner_id, to_fields(&record)?)
            .await
            .inspect_err(|e| tracing::warn!(owner_id, error = %e, "Profile create failed"))?;
        self.cache.invalidate_profile(owner_id);
        tracing::info!(owner_id, "Profile created");

        self.load_profile(owner_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile for {owner_id}")))
    }

    /// Get-or-create, used right after sign-in.
    pub async fn ensure_profile(&self, owner_id: &str, email: &str) -> Result<UserProfile> {
        if let Some(profile) = self.get_profile(owner_id).await? {
            return Ok(profile);
        }

        match self
            .create_profile(owner_id, email, None, InitialProfileFields::default())
            .await
        {
            Ok(profile) => Ok(profile),
            // Lost a race with another sign-in for the same owner.
            Err(AppError::Conflict(_)) => self
                .load_profile(owner_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("profile for {owner_id}"))),
            Err(e) => Err(e),
        }
    }

    /// Validate and store the pre-course survey.
    pub async fn submit_survey(&self, owner_id: &str, answers: SurveyAnswers) -> Result<UserProfile> {
        answers.validate()?;

        // Only seasons open for registration can be chosen.
        let season: Season = SeasonService::new(self.store.clone(), self.cache.clone())
            .list_active()
            .await?
            .into_iter()
            .find(|s| s.id == answers.season_id)
            .ok_or_else(|| {
                tracing::warn!(owner_id, season_id = %answers.season_id, "Survey names a season that is not open");
                AppError::Validation(format!("season not open: {}", answers.season_id))
            })?;

        self.update_profile(owner_id, answers.into_update(Some(season.name)))
            .await
    }

    pub async fn submit_reflection(&self, owner_id: &str, reflection: Reflection) -> Result<UserProfile> {
        self.update_profile(owner_id, reflection.into()).await
    }

    /// Every profile, for the admin user list.
    pub async fn list_all(&self) -> Result<Vec<UserProfile>> {
        self.all_users().fetch_once().await
    }

    /// Profiles registered for a season.
    pub async fn list_in_season(&self, season_id: &str) -> Result<Vec<UserProfile>> {
        Ok(users_in_season(self.list_all().await?, season_id))
    }

    /// Live view of every profile.
    pub fn all_users(&self) -> LiveQuery<UserProfile> {
        LiveQuery::new(self.store.clone(), collections::USER_INFO, Query::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DocumentStore, MemoryStore};
    use crate::models::TypingSkillLevel;
    use serde_json::json;
    use std::sync::Arc;

    fn service() -> (ProfileService, MemoryStore, PortalCache) {
        let memory = MemoryStore::new();
        let cache = PortalCache::new();
        (
            ProfileService::new(Arc::new(memory.clone()), cache.clone()),
            memory,
            cache,
        )
    }

    fn survey(season_id: &str) -> SurveyAnswers {
        SurveyAnswers {
            season_id: season_id.to_string(),
            last_name: "Yamada".to_string(),
            first_name: "Taro".to_string(),
            last_name_kana: "ヤマダ".to_string(),
            first_name_kana: "タロウ".to_string(),
            typing_skill_level: Some(TypingSkillLevel::BlindTouch),
            web_skill: "html".to_string(),
            programming_exp: "none".to_string(),
            ai_services: vec!["chat".to_string()],
            ai_usage: String::new(),
            project_expect: "Ship a site".to_string(),
        }
    }

    #[tokio::test]
    async fn test_update_without_profile_is_not_found_and_writes_nothing() {
        let (profiles, memory, _) = service();

        let update = ProfileUpdate {
            last_name: Some("Sato".to_string()),
            ..Default::default()
        };
        let result = profiles.update_profile("ghost", update).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        let stored = memory
            .query(collections::USER_INFO, &Query::new())
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_update_invalidates_cache_and_returns_fresh_record() {
        let (profiles, _, cache) = service();
        profiles
            .create_profile("u1", "u1@example.com", None, InitialProfileFields::default())
            .await
            .unwrap();
        profiles.get_profile("u1").await.unwrap();
        assert!(cache.profile("u1").is_some());

        let updated = profiles
            .update_profile(
                "u1",
                ProfileUpdate {
                    last_name: Some("Sato".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.last_name.as_deref(), Some("Sato"));
        let cached = profiles.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(cached.last_name.as_deref(), Some("Sato"));
    }

    #[tokio::test]
    async fn test_second_create_conflicts() {
        let (profiles, _, _) = service();
        profiles
            .create_profile("u1", "u1@example.com", Some("s1"), InitialProfileFields::default())
            .await
            .unwrap();

        let again = profiles
            .create_profile("u1", "u1@example.com", None, InitialProfileFields::default())
            .await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_created_profile_has_null_fields_and_is_unanswered() {
        let (profiles, memory, _) = service();
        let created = profiles
            .create_profile("u1", "u1@example.com", Some("s1"), InitialProfileFields::default())
            .await
            .unwrap();

        assert_eq!(created.season_id.as_deref(), Some("s1"));
        assert!(!crate::models::is_answered(Some(&created)));

        let raw = memory
            .get(collections::USER_INFO, "u1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(raw.fields.get("lastName"), Some(&serde_json::Value::Null));
    }

    #[tokio::test]
    async fn test_legacy_duplicate_resolves_to_newest_created() {
        let (profiles, memory, _) = service();
        for (id, created) in [("legacy-a", "2024-01-01T00:00:00Z"), ("legacy-b", "2024-06-01T00:00:00Z")] {
            memory.insert_raw(
                collections::USER_INFO,
                id,
                to_fields(&json!({ "uid": "u1", "email": id, "createdAt": created })).unwrap(),
            );
        }

        let profile = profiles.get_profile("u1").await.unwrap().unwrap();
        assert_eq!(profile.id, "legacy-b");

        let again = profiles
            .create_profile("u1", "u1@example.com", None, InitialProfileFields::default())
            .await;
        assert!(matches!(again, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_survey_validation_blocks_write() {
        let (profiles, _, _) = service();
        profiles
            .create_profile("u1", "u1@example.com", None, InitialProfileFields::default())
            .await
            .unwrap();

        let mut answers = survey("s1");
        answers.project_expect = "  ".to_string();
        let result = profiles.submit_survey("u1", answers).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        let profile = profiles.get_profile("u1").await.unwrap().unwrap();
        assert!(profile.last_name.is_none());
    }

    #[tokio::test]
    async fn test_survey_copies_season_name_and_completes_profile() {
        let (profiles, memory, _) = service();
        memory.insert_raw(
            collections::LECTURE_SEASONS,
            "s1",
            to_fields(&json!({ "name": "2024 Spring", "isActive": true })).unwrap(),
        );
        profiles.ensure_profile("u1", "u1@example.com").await.unwrap();

        let profile = profiles.submit_survey("u1", survey("s1")).await.unwrap();

        assert_eq!(profile.season_name.as_deref(), Some("2024 Spring"));
        assert!(crate::models::is_answered(Some(&profile)));
    }

    #[tokio::test]
    async fn test_survey_rejects_closed_season() {
        let (profiles, memory, _) = service();
        memory.insert_raw(
            collections::LECTURE_SEASONS,
            "closed",
            to_fields(&json!({ "name": "2023 Autumn", "isActive": false })).unwrap(),
        );
        profiles.ensure_profile("u1", "u1@example.com").await.unwrap();

        let result = profiles.submit_survey("u1", survey("closed")).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        let profile = profiles.get_profile("u1").await.unwrap().unwrap();
        assert!(profile.season_id.is_none());
        assert!(!crate::models::is_answered(Some(&profile)));
    }

    #[tokio::test]
    async fn test_ensure_profile_is_idempotent() {
        let (profiles, memory, _) = service();
        let first = profiles.ensure_profile("u1", "u1@example.com").await.unwrap();
        let second = profiles.ensure_profile("u1", "u1@example.com").await.unwrap();

        assert_eq!(first.id, second.id);
        let all = memory
            .query(collections::USER_INFO, &Query::new())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }
}
