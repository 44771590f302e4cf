// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Lecture season (one cohort of the program).

use crate::time_utils::Timestamp;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use super::profile::not_blank;

/// Season record in `lecture-season-collection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Season {
    pub id: String,
    pub name: String,
    /// Only active seasons are offered to students
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: Timestamp,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: Timestamp,
}

/// Admin form for creating or editing a season.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SeasonInput {
    #[validate(custom(function = "not_blank"), length(max = 100))]
    pub name: String,
    #[serde(default)]
    pub is_active: bool,
}

impl SeasonInput {
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self
    }
}

/// Lookup from season id to season name.
pub fn season_names(seasons: &[Season]) -> HashMap<&str, &str> {
    seasons
        .iter()
        .map(|s| (s.id.as_str(), s.name.as_str()))
        .collect()
}
