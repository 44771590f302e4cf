// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firestore-backed document store.
//!
//! Documents are read and written as untyped field maps. Firestore exposes
//! the document id to deserialization as `_firestore_id`; that and the other
//! `_firestore_*` metadata keys are stripped before records leave this module.

use super::{
    generate_document_id, stamp_new, stamp_update, ChangeHandler, Direction, DocumentStore,
    FieldValue, Fields, Query, StoredDocument, Subscription,
};
use crate::error::AppError;
use crate::time_utils::Timestamp;
use serde_json::Value;
use std::time::Duration;

const FIRESTORE_ID_KEY: &str = "_firestore_id";
const FIRESTORE_META_PREFIX: &str = "_firestore_";

/// Firestore database client.
#[derive(Clone)]
pub struct FirestoreStore {
    client: Option<firestore::FirestoreDb>,
    poll_interval: Duration,
}

impl FirestoreStore {
    /// Create a new Firestore client.
    ///
    /// For local development with emulator, set FIRESTORE_EMULATOR_HOST.
    pub async fn new(project_id: &str, poll_interval: Duration) -> Result<Self, AppError> {
        // If the emulator environment variable is set, use unauthenticated connection
        // to avoid local credential warnings and leakage.
        if std::env::var("FIRESTORE_EMULATOR_HOST").is_ok() {
            return Self::create_emulator_client(project_id, poll_interval).await;
        }

        let client = firestore::FirestoreDb::new(project_id)
            .await
            .map_err(|e| AppError::Database(format!("Failed to connect to Firestore: {}", e)))?;

        tracing::info!(project = project_id, "Connected to Firestore");

        Ok(Self {
            client: Some(client),
            poll_interval,
        })
    }

    /// Create a Firestore client for the emulator with unauthenticated access.
    async fn create_emulator_client(
        project_id: &str,
        poll_interval: Duration,
    ) -> Result<Self, AppError> {
        tracing::info!("Using unauthenticated connection for Firestore Emulator");

        let token_source = gcloud_sdk::ExternalJwtFunctionSource::new(|| async {
            Ok(gcloud_sdk::Token {
                token_type: "Bearer".to_string(),
                token: gcloud_sdk::SecretValue::new(
                    "eyJhbGciOiJub25lIn0.eyJ1aWQiOiJ0ZXN0In0."
                        .to_string()
                        .into(),
                ),
                expiry: chrono::Utc::now() + chrono::Duration::hours(1),
            })
        });

        let options = firestore::FirestoreDbOptions::new(project_id.to_string());

        let client = firestore::FirestoreDb::with_options_token_source(
            options,
            gcloud_sdk::GCP_DEFAULT_SCOPES.clone(),
            gcloud_sdk::TokenSourceType::ExternalSource(Box::new(token_source)),
        )
        .await
        .map_err(|e| {
            AppError::Database(format!("Failed to connect to Firestore Emulator: {}", e))
        })?;

        tracing::info!(
            project = project_id,
            "Connected to Firestore (Emulator/Unauthenticated)"
        );

        Ok(Self {
            client: Some(client),
            poll_interval,
        })
    }

    /// Create an offline client. All operations fail with a database error.
    pub fn new_offline() -> Self {
        Self {
            client: None,
            poll_interval: Duration::from_secs(5),
        }
    }

    /// Helper to get the client or return an error if offline.
    fn get_client(&self) -> Result<&firestore::FirestoreDb, AppError> {
        self.client
            .as_ref()
            .ok_or_else(|| AppError::Database("Database not connected (offline mode)".to_string()))
    }

    async fn run_query(
        client: &firestore::FirestoreDb,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<StoredDocument>, AppError> {
        let filters = query.filters.clone();
        let mut select = client
            .fluent()
            .select()
            .from(collection)
            .filter(move |q| {
                q.for_all(filters.iter().map(|f| match &f.value {
                    FieldValue::String(s) => q.field(f.field.as_str()).eq(s.clone()),
                    FieldValue::Bool(b) => q.field(f.field.as_str()).eq(*b),
                    FieldValue::Integer(i) => q.field(f.field.as_str()).eq(*i),
                }))
            });

        if let Some(order) = &query.order_by {
            let direction = match order.direction {
                Direction::Ascending => firestore::FirestoreQueryDirection::Ascending,
                Direction::Descending => firestore::FirestoreQueryDirection::Descending,
            };
            select = select.order_by([(order.field.as_str(), direction)]);
        }

        if let Some(limit) = query.limit {
            select = select.limit(limit);
        }

        let rows: Vec<Fields> = select
            .obj()
            .query()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(rows.into_iter().filter_map(into_stored).collect())
    }
}

/// Split Firestore's injected metadata from the document's own fields.
fn into_stored(mut fields: Fields) -> Option<StoredDocument> {
    let id = match fields.remove(FIRESTORE_ID_KEY) {
        Some(Value::String(id)) => id,
        _ => {
            tracing::warn!("Skipping Firestore row without document id");
            return None;
        }
    };
    fields.retain(|key, _| !key.starts_with(FIRESTORE_META_PREFIX));
    Some(StoredDocument { id, fields })
}

#[async_trait::async_trait]
impl DocumentStore for FirestoreStore {
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, AppError> {
        let id = generate_document_id()?;
        self.create(collection, &id, fields).await?;
        Ok(id)
    }

    async fn create(&self, collection: &str, id: &str, mut fields: Fields) -> Result<(), AppError> {
        stamp_new(&mut fields, Timestamp::now());

        let result: Result<Fields, firestore::errors::FirestoreError> = self
            .get_client()?
            .fluent()
            .insert()
            .into(collection)
            .document_id(id)
            .object(&fields)
            .execute()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(firestore::errors::FirestoreError::DataConflictError(_)) => {
                Err(AppError::Conflict(format!("{}/{}", collection, id)))
            }
            Err(e) => Err(AppError::Database(e.to_string())),
        }
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, AppError> {
        let fields: Option<Fields> = self
            .get_client()?
            .fluent()
            .select()
            .by_id_in(collection)
            .obj()
            .one(id)
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(fields.map(|mut fields| {
            fields.retain(|key, _| !key.starts_with(FIRESTORE_META_PREFIX));
            StoredDocument {
                id: id.to_string(),
                fields,
            }
        }))
    }

    async fn update(&self, collection: &str, id: &str, mut fields: Fields) -> Result<(), AppError> {
        // Firestore updates upsert; a partial update must not create a document.
        if self.get(collection, id).await?.is_none() {
            return Err(AppError::NotFound(format!("{}/{}", collection, id)));
        }

        stamp_update(&mut fields, Timestamp::now());
        let paths: Vec<String> = fields.keys().cloned().collect();

        let _: Fields = self
            .get_client()?
            .fluent()
            .update()
            .fields(paths)
            .in_col(collection)
            .document_id(id)
            .object(&fields)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError> {
        self.get_client()?
            .fluent()
            .delete()
            .from(collection)
            .document_id(id)
            .execute()
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        query: &Query,
    ) -> Result<Vec<StoredDocument>, AppError> {
        Self::run_query(self.get_client()?, collection, query).await
    }

    /// Poll the query and deliver a snapshot whenever it changes.
    ///
    /// Must be called from within a Tokio runtime.
    fn subscribe(
        &self,
        collection: &str,
        query: Query,
        on_change: ChangeHandler,
    ) -> Result<Subscription, AppError> {
        let client = self.get_client()?.clone();
        let collection = collection.to_string();
        let poll_interval = self.poll_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            let mut last: Option<Vec<StoredDocument>> = None;

            loop {
                interval.tick().await;
                match Self::run_query(&client, &collection, &query).await {
                    Ok(snapshot) => {
                        if last.as_ref() != Some(&snapshot) {
                            last = Some(snapshot.clone());
                            on_change(Ok(snapshot));
                        }
                    }
                    Err(e) => {
                        tracing::warn!(collection = %collection, error = %e, "Subscription poll failed");
                        on_change(Err(e));
                    }
                }
            }
        });

        Ok(Subscription::new(move || handle.abort()))
    }
}
