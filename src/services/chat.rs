// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Per-student chat threads between a student and the instructors.

use crate::db::{collections, decode_all, to_fields, Direction, Query, SharedStore, CREATED_AT};
use crate::error::{AppError, Result};
use crate::models::chat::{sorted_conversation, NewChatMessage};
use crate::models::{ChatInput, ChatMessage, SenderRole};
use crate::services::live::LiveQuery;
use validator::Validate;

#[derive(Clone)]
pub struct ChatService {
    store: SharedStore,
}

impl ChatService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    fn thread_query(student_id: &str) -> Query {
        Query::new()
            .where_eq("studentId", student_id)
            .order_by(CREATED_AT, Direction::Ascending)
    }

    /// The whole thread, oldest first.
    pub async fn conversation(&self, student_id: &str) -> Result<Vec<ChatMessage>> {
        let docs = self
            .store
            .query(collections::CHAT_MESSAGES, &Self::thread_query(student_id))
            .await
            .inspect_err(|e| tracing::error!(student_id, error = %e, "Failed to load chat"))?;
        Ok(sorted_conversation(decode_all(docs)?))
    }

    /// Live view of one thread.
    pub fn live_conversation(&self, student_id: &str) -> LiveQuery<ChatMessage> {
        LiveQuery::new(
            self.store.clone(),
            collections::CHAT_MESSAGES,
            Self::thread_query(student_id),
        )
    }

    pub async fn send_as_student(&self, owner_id: &str, input: ChatInput) -> Result<ChatMessage> {
        self.send(owner_id, Some(owner_id), SenderRole::Student, input)
            .await
    }

    pub async fn send_as_admin(&self, student_id: &str, input: ChatInput) -> Result<ChatMessage> {
        self.send(student_id, None, SenderRole::Admin, input).await
    }

    async fn send(
        &self,
        student_id: &str,
        sender_id: Option<&str>,
        sender_role: SenderRole,
        input: ChatInput,
    ) -> Result<ChatMessage> {
        input.validate()?;

        let record = NewChatMessage {
            student_id,
            sender_id,
            sender_role,
            message: input.message.trim(),
        };
        let id = self
            .store
            .add(collections::CHAT_MESSAGES, to_fields(&record)?)
            .await
            .inspect_err(|e| tracing::error!(student_id, error = %e, "Failed to send chat message"))?;
        tracing::debug!(student_id, message_id = %id, role = ?sender_role, "Chat message sent");

        self.store
            .get(collections::CHAT_MESSAGES, &id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("chat message {id}")))?
            .decode()
    }
}
