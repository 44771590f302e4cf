// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Assignment submissions.
//!
//! Saving edits the student's current record of that kind in place; a new
//! record is added only when the student has none yet.

use crate::db::{decode_all, to_fields, Query, SharedStore};
use crate::error::{AppError, Result};
use crate::models::submission::{CodeSubmissionForm, OriginalPlayForm};
use crate::models::{
    resolve_latest, LatestSubmissions, OriginalPlay, OriginalSite, Quiz, Submission, SubmissionKind,
};
use serde_json::Value;
use validator::Validate;

#[derive(Clone)]
pub struct SubmissionService {
    store: SharedStore,
}

impl SubmissionService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// The student's current record of kind `T`.
    pub async fn latest<T: Submission>(&self, student_id: &str) -> Result<Option<T>> {
        let collection = T::KIND.collection();
        let query = Query::new().where_eq("studentId", student_id);
        let docs = self
            .store
            .query(collection, &query)
            .await
            .inspect_err(|e| tracing::error!(student_id, collection, error = %e, "Failed to load submissions"))?;

        let records: Vec<T> = decode_all(docs)?;
        Ok(resolve_latest(&records, student_id).cloned())
    }

    /// Current record of every kind, loaded concurrently.
    pub async fn latest_all(&self, student_id: &str) -> Result<LatestSubmissions> {
        let (original_play, original_site, quiz) = tokio::try_join!(
            self.latest::<OriginalPlay>(student_id),
            self.latest::<OriginalSite>(student_id),
            self.latest::<Quiz>(student_id),
        )?;
        Ok(LatestSubmissions {
            original_play,
            original_site,
            quiz,
        })
    }

    /// Update the current record in place, or add the first one.
    pub async fn save<T: Submission>(&self, student_id: &str, form: T::Form) -> Result<T> {
        form.validate()?;
        let collection = T::KIND.collection();
        let mut fields = to_fields(&form)?;

        let id = match self.latest::<T>(student_id).await? {
            Some(current) => {
                let id = current.record_id().to_string();
                self.store
                    .update(collection, &id, fields)
                    .await
                    .inspect_err(|e| tracing::error!(student_id, collection, error = %e, "Failed to update submission"))?;
                id
            }
            None => {
                fields.insert("studentId".to_string(), Value::String(student_id.to_string()));
                self.store
                    .add(collection, fields)
                    .await
                    .inspect_err(|e| tracing::error!(student_id, collection, error = %e, "Failed to add submission"))?
            }
        };
        tracing::info!(student_id, kind = ?T::KIND, submission_id = %id, "Submission saved");

        self.store
            .get(collection, &id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("submission {id}")))?
            .decode()
    }

    /// Save a form whose kind is only known at runtime (from the URL).
    pub async fn save_kind(&self, student_id: &str, kind: SubmissionKind, form: Value) -> Result<Value> {
        let saved = match kind {
            SubmissionKind::OriginalPlay => {
                let form: OriginalPlayForm = parse_form(form)?;
                serde_json::to_value(self.save::<OriginalPlay>(student_id, form).await?)
            }
            SubmissionKind::OriginalSite => {
                let form: CodeSubmissionForm = parse_form(form)?;
                serde_json::to_value(self.save::<OriginalSite>(student_id, form).await?)
            }
            SubmissionKind::Quiz => {
                let form: CodeSubmissionForm = parse_form(form)?;
                serde_json::to_value(self.save::<Quiz>(student_id, form).await?)
            }
        };
        saved.map_err(|e| AppError::Internal(e.into()))
    }
}

fn parse_form<F: serde::de::DeserializeOwned>(form: Value) -> Result<F> {
    serde_json::from_value(form).map_err(|e| AppError::BadRequest(e.to_string()))
}
