// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Student–instructor chat messages.

use crate::time_utils::Timestamp;
use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;
use validator::Validate;

use super::profile::not_blank;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub enum SenderRole {
    Admin,
    Student,
}

/// Message record in `chat-message-collection`. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ChatMessage {
    pub id: String,
    /// Owner of the thread
    pub student_id: String,
    #[serde(default)]
    pub sender_id: Option<String>,
    pub sender_role: SenderRole,
    pub message: String,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub created_at: Timestamp,
    #[serde(default)]
    #[cfg_attr(feature = "binding-generation", ts(type = "string"))]
    pub updated_at: Timestamp,
}

/// Write payload for a new message.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct NewChatMessage<'a> {
    pub student_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_id: Option<&'a str>,
    pub sender_role: SenderRole,
    pub message: &'a str,
}

/// Message body posted by either side.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ChatInput {
    #[validate(custom(function = "not_blank"), length(max = 4000))]
    pub message: String,
}

/// Oldest first, ties by id.
pub fn sorted_conversation(mut messages: Vec<ChatMessage>) -> Vec<ChatMessage> {
    messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    messages
}
