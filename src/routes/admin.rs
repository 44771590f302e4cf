// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Admin portal API (requires the admin pass cookie).

use crate::error::{AppError, Result};
use crate::models::{
    is_answered, users_in_season, ChatInput, ChatMessage, Document, DocumentInput, DocumentType,
    LatestSubmissions, Notice, NoticeInput, NoticeRow, Season, SeasonInput, UserProfile,
};
use crate::routes::snapshot_events;
use crate::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Admin routes. The admin gate is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/api/seasons", get(list_seasons).post(add_season))
        .route(
            "/admin/api/seasons/{id}",
            put(update_season).delete(delete_season),
        )
        .route("/admin/api/notices", get(notice_table).post(add_notice))
        .route(
            "/admin/api/notices/{id}",
            put(update_notice).delete(delete_notice),
        )
        .route("/admin/api/documents", get(list_documents).post(add_document))
        .route("/admin/api/documents/next-order", get(next_document_order))
        .route(
            "/admin/api/documents/{id}",
            put(update_document).delete(delete_document),
        )
        .route("/admin/api/users", get(list_users))
        .route("/admin/api/users/stream", get(user_stream))
        .route("/admin/api/users/{uid}/submissions", get(user_submissions))
        .route(
            "/admin/api/chat/{student_id}",
            get(get_chat).post(send_chat),
        )
}

// ─── Seasons ─────────────────────────────────────────────────

async fn list_seasons(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Season>>> {
    Ok(Json(state.seasons().list_all().await?))
}

async fn add_season(
    State(state): State<Arc<AppState>>,
    Json(input): Json<SeasonInput>,
) -> Result<(StatusCode, Json<Season>)> {
    Ok((StatusCode::CREATED, Json(state.seasons().add(input).await?)))
}

async fn update_season(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<SeasonInput>,
) -> Result<Json<Season>> {
    Ok(Json(state.seasons().update(&id, input).await?))
}

async fn delete_season(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.seasons().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Notices ─────────────────────────────────────────────────

async fn notice_table(State(state): State<Arc<AppState>>) -> Result<Json<Vec<NoticeRow>>> {
    Ok(Json(state.notices().table().await?))
}

async fn add_notice(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NoticeInput>,
) -> Result<(StatusCode, Json<Notice>)> {
    Ok((StatusCode::CREATED, Json(state.notices().add(input).await?)))
}

async fn update_notice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<NoticeInput>,
) -> Result<Json<Notice>> {
    Ok(Json(state.notices().update(&id, input).await?))
}

async fn delete_notice(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.notices().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Documents ───────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct DocumentTypeParams {
    #[serde(rename = "type")]
    type_id: Option<i64>,
}

impl DocumentTypeParams {
    fn doc_type(&self) -> Result<Option<DocumentType>> {
        self.type_id
            .map(DocumentType::try_from)
            .transpose()
            .map_err(AppError::BadRequest)
    }
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DocumentTypeParams>,
) -> Result<Json<Vec<Document>>> {
    let documents = match params.doc_type()? {
        Some(doc_type) => state.documents().list_by_type(doc_type).await?,
        None => state.documents().list_all().await?,
    };
    Ok(Json(documents))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct NextOrderResponse {
    pub order_id: i64,
}

async fn next_document_order(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DocumentTypeParams>,
) -> Result<Json<NextOrderResponse>> {
    let doc_type = params
        .doc_type()?
        .ok_or_else(|| AppError::BadRequest("type is required".to_string()))?;
    Ok(Json(NextOrderResponse {
        order_id: state.documents().next_order(doc_type).await?,
    }))
}

async fn add_document(
    State(state): State<Arc<AppState>>,
    Json(input): Json<DocumentInput>,
) -> Result<(StatusCode, Json<Document>)> {
    Ok((StatusCode::CREATED, Json(state.documents().add(input).await?)))
}

async fn update_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<DocumentInput>,
) -> Result<Json<Document>> {
    Ok(Json(state.documents().update(&id, input).await?))
}

async fn delete_document(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode> {
    state.documents().delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ─── Users ───────────────────────────────────────────────────

/// A row in the admin user list.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserRow {
    pub display_name: String,
    pub is_answered: bool,
    #[serde(flatten)]
    pub profile: UserProfile,
}

impl From<UserProfile> for UserRow {
    fn from(profile: UserProfile) -> Self {
        Self {
            display_name: profile.display_name(),
            is_answered: is_answered(Some(&profile)),
            profile,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct UserListParams {
    season: Option<String>,
}

fn user_rows(users: Vec<UserProfile>, season: Option<&str>) -> Vec<UserRow> {
    let users = match season {
        Some(season_id) => users_in_season(users, season_id),
        None => users,
    };
    users.into_iter().map(UserRow::from).collect()
}

/// All users, or only those registered for `?season=`.
async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserListParams>,
) -> Result<Json<Vec<UserRow>>> {
    let users = state.profiles().list_all().await?;
    Ok(Json(user_rows(users, params.season.as_deref())))
}

async fn user_stream(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UserListParams>,
) -> Result<impl IntoResponse> {
    let stream = state.profiles().all_users().into_stream()?;
    let season = params.season;
    Ok(snapshot_events(stream, move |users| {
        user_rows(users, season.as_deref())
    }))
}

async fn user_submissions(
    State(state): State<Arc<AppState>>,
    Path(uid): Path<String>,
) -> Result<Json<LatestSubmissions>> {
    Ok(Json(state.submissions().latest_all(&uid).await?))
}

// ─── Chat ────────────────────────────────────────────────────

async fn get_chat(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
) -> Result<Json<Vec<ChatMessage>>> {
    Ok(Json(state.chat().conversation(&student_id).await?))
}

async fn send_chat(
    State(state): State<Arc<AppState>>,
    Path(student_id): Path<String>,
    Json(input): Json<ChatInput>,
) -> Result<Json<ChatMessage>> {
    Ok(Json(state.chat().send_as_admin(&student_id, input).await?))
}
