// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Course documentation pages.

use crate::db::{collections, decode_all, to_fields, Query, SharedStore};
use crate::error::{AppError, Result};
use crate::models::document::{documents_of_type, next_order};
use crate::models::{Document, DocumentInput, DocumentType, NextOrderPolicy};
use validator::Validate;

#[derive(Clone)]
pub struct DocumentService {
    store: SharedStore,
    policy: NextOrderPolicy,
}

impl DocumentService {
    pub fn new(store: SharedStore, policy: NextOrderPolicy) -> Self {
        Self { store, policy }
    }

    async fn query_type(&self, doc_type: DocumentType) -> Result<Vec<Document>> {
        let query = Query::new().where_eq("typeId", doc_type.id());
        let docs = self
            .store
            .query(collections::DOCUMENTS, &query)
            .await
            .inspect_err(|e| tracing::error!(type_id = doc_type.id(), error = %e, "Failed to list documents"))?;
        decode_all(docs)
    }

    /// Documents of one type in reading order.
    pub async fn list_by_type(&self, doc_type: DocumentType) -> Result<Vec<Document>> {
        Ok(documents_of_type(self.query_type(doc_type).await?, doc_type))
    }

    /// Every document, grouped by type and in reading order within a type.
    pub async fn list_all(&self) -> Result<Vec<Document>> {
        let mut docs: Vec<Document> =
            decode_all(self.store.query(collections::DOCUMENTS, &Query::new()).await?)?;
        docs.sort_by(|a, b| {
            a.type_id
                .id()
                .cmp(&b.type_id.id())
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        Ok(docs)
    }

    /// Suggested order value for a new document of `doc_type`.
    pub async fn next_order(&self, doc_type: DocumentType) -> Result<i64> {
        Ok(next_order(&self.query_type(doc_type).await?, doc_type, self.policy))
    }

    pub async fn get(&self, id: &str) -> Result<Document> {
        self.store
            .get(collections::DOCUMENTS, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("document {id}")))?
            .decode()
    }

    pub async fn add(&self, mut input: DocumentInput) -> Result<Document> {
        input.validate()?;
        if input.order_id.is_none() {
            input.order_id = Some(self.next_order(input.type_id).await?);
        }

        let id = self
            .store
            .add(collections::DOCUMENTS, to_fields(&input)?)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "Failed to add document"))?;
        tracing::info!(document_id = %id, type_id = input.type_id.id(), "Document added");
        self.get(&id).await
    }

    pub async fn update(&self, id: &str, input: DocumentInput) -> Result<Document> {
        input.validate()?;
        self.store
            .update(collections::DOCUMENTS, id, to_fields(&input)?)
            .await
            .inspect_err(|e| tracing::error!(document_id = id, error = %e, "Failed to update document"))?;
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        self.store
            .delete(collections::DOCUMENTS, id)
            .await
            .inspect_err(|e| tracing::error!(document_id = id, error = %e, "Failed to delete document"))?;
        tracing::info!(document_id = id, "Document deleted");
        Ok(())
    }
}
