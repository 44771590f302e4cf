// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course documentation pages.

use crate::time_utils::Timestamp;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use super::profile::not_blank;

/// Documentation category, stored as its numeric type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum DocumentType {
    FirstDay = 1,
    Faq = 2,
    FinalDay = 3,
    Step1Setup = 4,
    Step2CommonTask = 5,
    Step3OriginalWeb = 6,
}

impl DocumentType {
    pub const ALL: [DocumentType; 6] = [
        DocumentType::FirstDay,
        DocumentType::Faq,
        DocumentType::FinalDay,
        DocumentType::Step1Setup,
        DocumentType::Step2CommonTask,
        DocumentType::Step3OriginalWeb,
    ];

    pub fn id(self) -> i64 {
        self as i64
    }
}

impl TryFrom<i64> for DocumentType {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        DocumentType::ALL
            .into_iter()
            .find(|t| t.id() == value)
            .ok_or_else(|| format!("unknown document type: {value}"))
    }
}

impl From<DocumentType> for i64 {
    fn from(value: DocumentType) -> Self {
        value.id()
    }
}

/// Document record in `document-collection`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct Document {
    pub id: String,
    #[cfg_attr(feature = "binding-generation", ts(type = "number"))]
    pub type_id: DocumentType,
    #[serde(default)]
    pub order_id: i64,
    pub title: String,
    /// Markdown source; rendered by the frontend.
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: Timestamp,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: Timestamp,
}

/// Admin form for creating or editing a document.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct DocumentInput {
    pub type_id: DocumentType,
    /// Defaults to the next order for the type when omitted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[validate(custom(function = "not_blank"), length(max = 200))]
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// How a new document's default order value is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NextOrderPolicy {
    /// The current maximum order among documents of the type. New documents
    /// tie with the current last one; existing data was written this way.
    #[default]
    CurrentMax,
    /// One past the current maximum.
    MaxPlusOne,
}

/// Documents of one type, ascending by order.
pub fn documents_of_type(documents: Vec<Document>, doc_type: DocumentType) -> Vec<Document> {
    let mut docs: Vec<Document> = documents
        .into_iter()
        .filter(|d| d.type_id == doc_type)
        .collect();
    docs.sort_by(|a, b| a.order_id.cmp(&b.order_id));
    docs
}

/// Default order value for a new document of `doc_type`. 1 when none exist.
pub fn next_order(documents: &[Document], doc_type: DocumentType, policy: NextOrderPolicy) -> i64 {
    let max = documents
        .iter()
        .filter(|d| d.type_id == doc_type)
        .map(|d| d.order_id)
        .max();

    match (max, policy) {
        (None, _) => 1,
        (Some(max), NextOrderPolicy::CurrentMax) => max,
        (Some(max), NextOrderPolicy::MaxPlusOne) => max.saturating_add(1),
    }
}
