// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Assignment submissions and latest-record resolution.
//!
//! A student accumulates many historical records per submission kind. The
//! "current" one is the record with the newest `updatedAt`; saves update that
//! record in place instead of adding another.

use crate::db::collections;
use crate::time_utils::Timestamp;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use super::profile::not_blank;

/// A record owned by one student, comparable by recency.
pub trait OwnedRecord {
    fn owner_id(&self) -> &str;
    fn updated_at(&self) -> Timestamp;
    fn record_id(&self) -> &str;
}

/// The most recently updated record belonging to `owner_id`.
///
/// Exactly equal timestamps are broken by the greater record id, so the same
/// input always selects the same winner.
pub fn resolve_latest<'a, T: OwnedRecord>(records: &'a [T], owner_id: &str) -> Option<&'a T> {
    records
        .iter()
        .filter(|r| r.owner_id() == owner_id)
        .max_by(|a, b| {
            a.updated_at()
                .cmp(&b.updated_at())
                .then_with(|| a.record_id().cmp(b.record_id()))
        })
}

/// The three assignment kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SubmissionKind {
    OriginalPlay,
    OriginalSite,
    Quiz,
}

impl SubmissionKind {
    pub fn collection(self) -> &'static str {
        match self {
            SubmissionKind::OriginalPlay => collections::SUBMISSION_ORIGINAL_PLAY,
            SubmissionKind::OriginalSite => collections::SUBMISSION_ORIGINAL_SITE,
            SubmissionKind::Quiz => collections::SUBMISSION_QUIZ,
        }
    }
}

impl std::str::FromStr for SubmissionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original-play" => Ok(SubmissionKind::OriginalPlay),
            "original-site" => Ok(SubmissionKind::OriginalSite),
            "quiz" => Ok(SubmissionKind::Quiz),
            other => Err(format!("unknown submission kind: {other}")),
        }
    }
}

/// A stored submission of a specific kind.
pub trait Submission: OwnedRecord + Clone + DeserializeOwned + Send + Sync + 'static {
    const KIND: SubmissionKind;
    /// Kind-specific form fields.
    type Form: Serialize + Validate + Send + Sync;
}

macro_rules! owned_record {
    ($ty:ty) => {
        impl OwnedRecord for $ty {
            fn owner_id(&self) -> &str {
                &self.student_id
            }

            fn updated_at(&self) -> Timestamp {
                self.updated_at
            }

            fn record_id(&self) -> &str {
                &self.id
            }
        }
    };
}

/// Step 3 planning sheet: what the original site is and who it is for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OriginalPlay {
    pub id: String,
    pub student_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub target_user: String,
    #[serde(default)]
    pub user_story: String,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: Timestamp,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OriginalPlayForm {
    #[validate(custom(function = "not_blank"))]
    pub title: String,
    #[validate(custom(function = "not_blank"))]
    pub target_user: String,
    #[validate(custom(function = "not_blank"))]
    pub user_story: String,
}

/// The finished original site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct OriginalSite {
    pub id: String,
    pub student_id: String,
    #[serde(default)]
    pub key_feature: String,
    #[serde(default)]
    pub source_code: String,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: Timestamp,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: Timestamp,
}

/// Quiz answer: same shape as the original site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Quiz {
    pub id: String,
    pub student_id: String,
    #[serde(default)]
    pub key_feature: String,
    #[serde(default)]
    pub source_code: String,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: Timestamp,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: Timestamp,
}

/// Form shared by the original-site and quiz kinds.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CodeSubmissionForm {
    #[validate(custom(function = "not_blank"))]
    pub key_feature: String,
    #[validate(custom(function = "not_blank"))]
    pub source_code: String,
}

owned_record!(OriginalPlay);
owned_record!(OriginalSite);
owned_record!(Quiz);

impl Submission for OriginalPlay {
    const KIND: SubmissionKind = SubmissionKind::OriginalPlay;
    type Form = OriginalPlayForm;
}

impl Submission for OriginalSite {
    const KIND: SubmissionKind = SubmissionKind::OriginalSite;
    type Form = CodeSubmissionForm;
}

impl Submission for Quiz {
    const KIND: SubmissionKind = SubmissionKind::Quiz;
    type Form = CodeSubmissionForm;
}

/// The current submission of each kind for one student.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct LatestSubmissions {
    pub original_play: Option<OriginalPlay>,
    pub original_site: Option<OriginalSite>,
    pub quiz: Option<Quiz>,
}

impl LatestSubmissions {
    /// Resolve the latest record per kind, independently for each kind.
    pub fn resolve(
        plays: &[OriginalPlay],
        sites: &[OriginalSite],
        quizzes: &[Quiz],
        student_id: &str,
    ) -> Self {
        Self {
            original_play: resolve_latest(plays, student_id).cloned(),
            original_site: resolve_latest(sites, student_id).cloned(),
            quiz: resolve_latest(quizzes, student_id).cloned(),
        }
    }
}
