// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Database layer.
//!
//! Every backend speaks the same collection-scoped contract: add, create,
//! get, update, delete, query and subscribe. Records travel as untyped field
//! maps; the typed repositories in `services` decode them into models.

pub mod firestore;
pub mod memory;

pub use firestore::FirestoreStore;
pub use memory::MemoryStore;

use crate::error::AppError;
use crate::time_utils::Timestamp;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::cmp::Ordering;
use std::sync::Arc;

/// Collection names as constants.
pub mod collections {
    pub const USER_INFO: &str = "user-info-collection";
    pub const LECTURE_SEASONS: &str = "lecture-season-collection";
    pub const NOTICES: &str = "notice-collection";
    pub const DOCUMENTS: &str = "document-collection";
    pub const CHAT_MESSAGES: &str = "chat-message-collection";
    pub const SUBMISSION_ORIGINAL_PLAY: &str = "submission-original-play-collection";
    pub const SUBMISSION_ORIGINAL_SITE: &str = "submission-original-site-collection";
    pub const SUBMISSION_QUIZ: &str = "submission-quiz-collection";
}

pub const CREATED_AT: &str = "createdAt";
pub const UPDATED_AT: &str = "updatedAt";

/// Raw document fields.
pub type Fields = serde_json::Map<String, Value>;

/// A document as returned by the store: its id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub fields: Fields,
}

impl StoredDocument {
    /// Decode into a model. The document id is exposed to the model as `id`.
    pub fn decode<T: DeserializeOwned>(self) -> Result<T, AppError> {
        let mut fields = self.fields;
        fields.insert("id".to_string(), Value::String(self.id));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Decode a list of documents, failing on the first malformed one.
pub fn decode_all<T: DeserializeOwned>(docs: Vec<StoredDocument>) -> Result<Vec<T>, AppError> {
    docs.into_iter().map(StoredDocument::decode).collect()
}

/// Serialize a write payload into a field map.
///
/// `None` fields must be skipped by the payload's serde attributes if they
/// are meant to be left untouched.
pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, AppError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::Internal(anyhow::anyhow!(
            "write payload did not serialize to an object"
        ))),
        Err(e) => Err(AppError::Internal(e.into())),
    }
}

/// Stamp both creation and update times on a new document.
pub(crate) fn stamp_new(fields: &mut Fields, now: Timestamp) {
    let now = Value::String(now.to_rfc3339());
    fields.insert(CREATED_AT.to_string(), now.clone());
    fields.insert(UPDATED_AT.to_string(), now);
}

/// Stamp the update time on a partial update.
pub(crate) fn stamp_update(fields: &mut Fields, now: Timestamp) {
    fields.insert(UPDATED_AT.to_string(), Value::String(now.to_rfc3339()));
}

/// Generate a random 20-character document id.
pub(crate) fn generate_document_id() -> Result<String, AppError> {
    use ring::rand::{SecureRandom, SystemRandom};

    let mut bytes = [0u8; 10];
    SystemRandom::new()
        .fill(&mut bytes)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("random id generation failed")))?;
    Ok(hex::encode(bytes))
}

// ─── Queries ─────────────────────────────────────────────────

/// Equality filter operand.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    String(String),
    Bool(bool),
    Integer(i64),
}

impl FieldValue {
    fn matches(&self, value: Option<&Value>) -> bool {
        match (self, value) {
            (FieldValue::String(expected), Some(Value::String(actual))) => expected == actual,
            (FieldValue::Bool(expected), Some(Value::Bool(actual))) => expected == actual,
            (FieldValue::Integer(expected), Some(Value::Number(actual))) => {
                actual.as_i64() == Some(*expected)
            }
            _ => false,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: FieldValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// Equality filters, an optional single ordering and an optional limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<u32>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<FieldValue>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Whether a document satisfies every filter.
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters
            .iter()
            .all(|f| f.value.matches(fields.get(&f.field)))
    }

    /// Apply filters, ordering and limit to an in-memory document set.
    pub fn apply(&self, docs: impl IntoIterator<Item = StoredDocument>) -> Vec<StoredDocument> {
        let mut docs: Vec<StoredDocument> =
            docs.into_iter().filter(|d| self.matches(&d.fields)).collect();

        if let Some(order) = &self.order_by {
            docs.sort_by(|a, b| {
                let ord = SortKey::of(a.fields.get(&order.field))
                    .cmp(&SortKey::of(b.fields.get(&order.field)));
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            docs.truncate(limit as usize);
        }
        docs
    }
}

/// Total order over field values, with timestamps compared as instants.
#[derive(Debug, PartialEq)]
enum SortKey {
    Missing,
    Bool(bool),
    Number(f64),
    Instant(Timestamp),
    Text(String),
}

impl SortKey {
    fn of(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => SortKey::Missing,
            Some(Value::Bool(b)) => SortKey::Bool(*b),
            Some(Value::Number(n)) => SortKey::Number(n.as_f64().unwrap_or_default()),
            Some(Value::String(s)) => match Timestamp::parse_iso(s) {
                Some(ts) => SortKey::Instant(ts),
                None => SortKey::Text(s.clone()),
            },
            Some(other @ Value::Object(_)) => serde_json::from_value::<Timestamp>(other.clone())
                .map(SortKey::Instant)
                .unwrap_or(SortKey::Missing),
            Some(Value::Array(_)) => SortKey::Missing,
        }
    }

    fn rank(&self) -> u8 {
        match self {
            SortKey::Missing => 0,
            SortKey::Bool(_) => 1,
            SortKey::Number(_) => 2,
            SortKey::Instant(_) => 3,
            SortKey::Text(_) => 4,
        }
    }
}

impl Eq for SortKey {}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Bool(a), SortKey::Bool(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Instant(a), SortKey::Instant(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

// ─── Subscriptions ───────────────────────────────────────────

/// Callback invoked with each fresh snapshot of a subscribed query.
pub type ChangeHandler = Arc<dyn Fn(Result<Vec<StoredDocument>, AppError>) + Send + Sync>;

/// Handle to a live query. Releases its listener exactly once, either on
/// [`Subscription::unsubscribe`] or on drop.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Holds at most one subscription; re-subscribing releases the old one first.
#[derive(Debug, Default)]
pub struct SubscriptionSlot {
    current: Option<Subscription>,
}

impl SubscriptionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Release the held subscription (if any), then install a new one.
    pub fn resubscribe<F>(&mut self, subscribe: F) -> Result<(), AppError>
    where
        F: FnOnce() -> Result<Subscription, AppError>,
    {
        self.clear();
        self.current = Some(subscribe()?);
        Ok(())
    }

    pub fn clear(&mut self) {
        if let Some(sub) = self.current.take() {
            sub.unsubscribe();
        }
    }

    pub fn is_active(&self) -> bool {
        self.current.is_some()
    }
}

// ─── Store contract ──────────────────────────────────────────

/// Collection-scoped document store.
///
/// `add` and `create` stamp `createdAt` and `updatedAt`; `update` stamps
/// `updatedAt`. `update` on a missing document fails with `NotFound`.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Insert a document under a generated id and return that id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, AppError>;

    /// Insert a document under a caller-chosen id; `Conflict` if it exists.
    async fn create(&self, collection: &str, id: &str, fields: Fields) -> Result<(), AppError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, AppError>;

    /// Merge `fields` into an existing document.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), AppError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), AppError>;

    async fn query(&self, collection: &str, query: &Query)
        -> Result<Vec<StoredDocument>, AppError>;

    /// Deliver the query's current result, then every subsequent change,
    /// until the returned subscription is released.
    fn subscribe(
        &self,
        collection: &str,
        query: Query,
        on_change: ChangeHandler,
    ) -> Result<Subscription, AppError>;
}

/// Shared store handle.
pub type SharedStore = Arc<dyn DocumentStore>;
