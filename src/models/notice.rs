// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Notices and their student/admin orderings.

use crate::models::season::{season_names, Season};
use crate::time_utils::Timestamp;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use super::profile::not_blank;

/// Notice record in `notice-collection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Notice {
    pub id: String,
    /// Older notices predate seasons and have no season id.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub season_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_publish: bool,
    #[serde(default)]
    pub order_id: i64,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: Timestamp,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: Timestamp,
}

fn null_as_empty<'de, D: serde::Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Admin form for creating or editing a notice.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NoticeInput {
    #[validate(custom(function = "not_blank"))]
    pub season_id: String,
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub is_publish: bool,
    #[serde(default)]
    pub order_id: i64,
}

/// A notice row in the admin table, labeled with its season's name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NoticeRow {
    #[serde(flatten)]
    pub notice: Notice,
    pub season_name: Option<String>,
}

/// Notices a student sees: published, in their season, highest order first.
pub fn student_feed(notices: Vec<Notice>, season_id: &str) -> Vec<Notice> {
    let mut feed: Vec<Notice> = notices
        .into_iter()
        .filter(|n| n.is_publish && n.season_id == season_id)
        .collect();
    feed.sort_by(|a, b| b.order_id.cmp(&a.order_id));
    feed
}

/// Every notice in ascending order, labeled with its season name.
pub fn admin_table(notices: Vec<Notice>, seasons: &[Season]) -> Vec<NoticeRow> {
    let names = season_names(seasons);
    let mut rows: Vec<NoticeRow> = notices
        .into_iter()
        .map(|notice| {
            let season_name = names.get(notice.season_id.as_str()).map(|n| n.to_string());
            NoticeRow {
                notice,
                season_name,
            }
        })
        .collect();
    rows.sort_by(|a, b| a.notice.order_id.cmp(&b.notice.order_id));
    rows
}
