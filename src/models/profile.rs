// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Student profile and pre-course survey.

use crate::time_utils::Timestamp;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

/// Self-reported typing skill, stored as its numeric level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum TypingSkillLevel {
    /// Touch types without looking
    BlindTouch = 1,
    /// Types while looking at the keyboard
    KeyboardLooking = 2,
    /// Needs the keyboard and a romaji chart
    KeyboardAndChart = 3,
    /// Unsure what typing means
    NotSure = 4,
}

impl TryFrom<u8> for TypingSkillLevel {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::BlindTouch),
            2 => Ok(Self::KeyboardLooking),
            3 => Ok(Self::KeyboardAndChart),
            4 => Ok(Self::NotSure),
            other => Err(format!("typing skill level out of range: {other}")),
        }
    }
}

impl From<TypingSkillLevel> for u8 {
    fn from(value: TypingSkillLevel) -> Self {
        value as u8
    }
}

/// Profile record in `user-info-collection`.
///
/// Web skill and programming experience are free category labels chosen
/// from a fixed list by the frontend; the backend only checks presence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    /// Identity-provider user id (owner id)
    pub uid: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub season_id: Option<String>,
    #[serde(default)]
    pub season_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name_kana: Option<String>,
    #[serde(default)]
    pub first_name_kana: Option<String>,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "1 | 2 | 3 | 4 | null"))]
    pub typing_skill_level: Option<TypingSkillLevel>,
    #[serde(default)]
    pub web_skill: Option<String>,
    #[serde(default)]
    pub programming_exp: Option<String>,
    #[serde(default)]
    pub ai_services: Option<Vec<String>>,
    #[serde(default)]
    pub ai_usage: Option<String>,
    #[serde(default)]
    pub project_expect: Option<String>,
    #[serde(default)]
    pub reflection_impression: Option<String>,
    #[serde(default)]
    pub reflection_good: Option<String>,
    #[serde(default)]
    pub reflection_improve: Option<String>,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: Timestamp,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: Timestamp,
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Whether the pre-course survey is fully answered.
///
/// AI services and AI usage are optional. Derived on every read, never stored,
/// so a later update that blanks a required field makes it false again.
pub fn is_answered(profile: Option<&UserProfile>) -> bool {
    let Some(p) = profile else {
        return false;
    };

    filled(&p.last_name)
        && filled(&p.first_name)
        && filled(&p.last_name_kana)
        && filled(&p.first_name_kana)
        && p.typing_skill_level.is_some()
        && filled(&p.web_skill)
        && filled(&p.programming_exp)
        && filled(&p.project_expect)
}

impl UserProfile {
    /// "Last First" for admin listings, falling back to the email address.
    pub fn display_name(&self) -> String {
        let name = format!(
            "{} {}",
            self.last_name.as_deref().unwrap_or_default(),
            self.first_name.as_deref().unwrap_or_default()
        );
        let name = name.trim();
        if name.is_empty() {
            self.email.clone()
        } else {
            name.to_string()
        }
    }
}

/// Students registered for `season_id`. An empty season id selects nobody.
pub fn users_in_season(users: Vec<UserProfile>, season_id: &str) -> Vec<UserProfile> {
    if season_id.is_empty() {
        return Vec::new();
    }
    users
        .into_iter()
        .filter(|u| u.season_id.as_deref() == Some(season_id))
        .collect()
}

/// Among duplicate profiles for one owner, the most recently created.
///
/// Ties go to the greater record id, matching [`super::resolve_latest`].
pub fn resolve_newest_created<'a>(profiles: &'a [UserProfile], uid: &str) -> Option<&'a UserProfile> {
    profiles
        .iter()
        .filter(|p| p.uid == uid)
        .max_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)))
}

/// Partial profile update. Only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub season_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name_kana: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name_kana: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typing_skill_level: Option<TypingSkillLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_skill: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub programming_exp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_services: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_usage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_expect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection_impression: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection_good: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reflection_improve: Option<String>,
}

/// Fields of a freshly created profile. Everything not supplied is stored as null.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewProfile<'a> {
    pub uid: &'a str,
    pub email: &'a str,
    pub season_id: Option<&'a str>,
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name_kana: Option<String>,
    pub first_name_kana: Option<String>,
    pub typing_skill_level: Option<TypingSkillLevel>,
}

/// Initial values accepted at profile creation.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitialProfileFields {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name_kana: Option<String>,
    pub first_name_kana: Option<String>,
    pub typing_skill_level: Option<TypingSkillLevel>,
}

/// Survey form as submitted by the student.
///
/// Validated before any store call; a blank required field blocks the write.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SurveyAnswers {
    #[validate(custom(function = "not_blank"))]
    pub season_id: String,
    #[validate(custom(function = "not_blank"))]
    pub last_name: String,
    #[validate(custom(function = "not_blank"))]
    pub first_name: String,
    #[validate(custom(function = "not_blank"))]
    pub last_name_kana: String,
    #[validate(custom(function = "not_blank"))]
    pub first_name_kana: String,
    #[validate(required)]
    pub typing_skill_level: Option<TypingSkillLevel>,
    #[validate(custom(function = "not_blank"))]
    pub web_skill: String,
    #[validate(custom(function = "not_blank"))]
    pub programming_exp: String,
    #[serde(default)]
    pub ai_services: Vec<String>,
    #[serde(default)]
    pub ai_usage: String,
    #[validate(custom(function = "not_blank"))]
    pub project_expect: String,
}

impl SurveyAnswers {
    /// Convert validated answers into a profile update for the chosen season.
    pub fn into_update(self, season_name: Option<String>) -> ProfileUpdate {
        ProfileUpdate {
            season_id: Some(self.season_id),
            season_name,
            last_name: Some(self.last_name),
            first_name: Some(self.first_name),
            last_name_kana: Some(self.last_name_kana),
            first_name_kana: Some(self.first_name_kana),
            typing_skill_level: self.typing_skill_level,
            web_skill: Some(self.web_skill),
            programming_exp: Some(self.programming_exp),
            ai_services: Some(self.ai_services),
            ai_usage: Some(self.ai_usage),
            project_expect: Some(self.project_expect),
            ..Default::default()
        }
    }
}

/// Post-course reflection. All fields optional free text.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    #[serde(default)]
    pub impression: String,
    #[serde(default)]
    pub good: String,
    #[serde(default)]
    pub improve: String,
}

impl From<Reflection> for ProfileUpdate {
    fn from(value: Reflection) -> Self {
        ProfileUpdate {
            reflection_impression: Some(value.impression),
            reflection_good: Some(value.good),
            reflection_improve: Some(value.improve),
            ..Default::default()
        }
    }
}

/// Rejects empty or whitespace-only text.
pub fn not_blank(value: &str) -> Result<(), validator::ValidationError> {
    if value.trim().is_empty() {
        return Err(validator::ValidationError::new("blank"));
    }
    Ok(())
}
