// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Student portal API (requires a session).

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_session_token, session_cookie, AuthUser};
use crate::models::chat::sorted_conversation;
use crate::models::{
    is_answered, ChatInput, ChatMessage, Document, DocumentType, LatestSubmissions, Notice,
    Reflection, Season, SubmissionKind, SurveyAnswers, UserProfile,
};
use crate::routes::snapshot_events;
use crate::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::{get, put},
    Extension, Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::sync::Arc;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// Student routes. The session middleware is applied in routes/mod.rs.
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/session", get(get_session).post(start_session))
        .route("/api/profile", get(get_profile))
        .route("/api/profile/survey", put(submit_survey))
        .route("/api/profile/reflection", put(submit_reflection))
        .route("/api/seasons", get(list_seasons))
        .route("/api/notices", get(list_notices))
        .route("/api/documents/{type_id}", get(list_documents))
        .route("/api/chat", get(get_chat).post(send_chat))
        .route("/api/chat/stream", get(chat_stream))
        .route("/api/submissions", get(get_submissions))
        .route("/api/submissions/{kind}", put(save_submission))
}

// ─── Session & Profile ───────────────────────────────────────

/// Profile with its derived survey state.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct ProfileResponse {
    pub profile: Option<UserProfile>,
    /// Whether the pre-course survey is complete
    pub is_answered: bool,
}

impl From<Option<UserProfile>> for ProfileResponse {
    fn from(profile: Option<UserProfile>) -> Self {
        let is_answered = is_answered(profile.as_ref());
        Self {
            profile,
            is_answered,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct SessionResponse {
    pub owner_id: String,
    pub email: String,
    #[serde(flatten)]
    pub profile: ProfileResponse,
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<SessionResponse>> {
    let profile = state.profiles().get_profile(&user.owner_id).await?;
    Ok(Json(SessionResponse {
        owner_id: user.owner_id,
        email: user.email,
        profile: profile.into(),
    }))
}

/// Renew the session cookie of an already signed-in user.
async fn start_session(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    jar: CookieJar,
) -> Result<impl IntoResponse> {
    open_session(&state, jar, user.owner_id, user.email).await
}

/// Make sure the profile exists and persist the session as a cookie.
pub(crate) async fn open_session(
    state: &AppState,
    jar: CookieJar,
    owner_id: String,
    email: String,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let profile = state.profiles().ensure_profile(&owner_id, &email).await?;

    let token = create_session_token(&owner_id, &email, &state.config.session_signing_key)?;
    let jar = jar.add(session_cookie(token, &state.config.frontend_url));

    tracing::info!(owner_id = %owner_id, "Session started");
    Ok((
        jar,
        Json(SessionResponse {
            owner_id,
            email,
            profile: Some(profile).into(),
        }),
    ))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let profile = state.profiles().get_profile(&user.owner_id).await?;
    Ok(Json(profile.into()))
}

async fn submit_survey(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(answers): Json<SurveyAnswers>,
) -> Result<Json<ProfileResponse>> {
    let profile = state
        .profiles()
        .submit_survey(&user.owner_id, answers)
        .await?;
    Ok(Json(Some(profile).into()))
}

async fn submit_reflection(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(reflection): Json<Reflection>,
) -> Result<Json<ProfileResponse>> {
    let profile = state
        .profiles()
        .submit_reflection(&user.owner_id, reflection)
        .await?;
    Ok(Json(Some(profile).into()))
}

// ─── Course content ──────────────────────────────────────────

/// Seasons a student may register for.
async fn list_seasons(State(state): State<Arc<AppState>>) -> Result<Json<Vec<Season>>> {
    Ok(Json(state.seasons().list_active().await?))
}

async fn list_notices(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<Notice>>> {
    Ok(Json(state.notices().for_student(&user.owner_id).await?))
}

async fn list_documents(
    State(state): State<Arc<AppState>>,
    Path(type_id): Path<i64>,
) -> Result<Json<Vec<Document>>> {
    let doc_type = DocumentType::try_from(type_id).map_err(AppError::BadRequest)?;
    Ok(Json(state.documents().list_by_type(doc_type).await?))
}

// ─── Chat ────────────────────────────────────────────────────

async fn get_chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<Vec<ChatMessage>>> {
    Ok(Json(state.chat().conversation(&user.owner_id).await?))
}

async fn send_chat(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Json(input): Json<ChatInput>,
) -> Result<Json<ChatMessage>> {
    Ok(Json(state.chat().send_as_student(&user.owner_id, input).await?))
}

/// Live thread as Server-Sent Events; each event carries the whole thread.
async fn chat_stream(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse> {
    let stream = state
        .chat()
        .live_conversation(&user.owner_id)
        .into_stream()?;
    tracing::debug!(owner_id = %user.owner_id, "Chat stream opened");
    Ok(snapshot_events(stream, sorted_conversation))
}

// ─── Submissions ─────────────────────────────────────────────

async fn get_submissions(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
) -> Result<Json<LatestSubmissions>> {
    Ok(Json(state.submissions().latest_all(&user.owner_id).await?))
}

async fn save_submission(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthUser>,
    Path(kind): Path<String>,
    Json(form): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>> {
    let kind: SubmissionKind = kind.parse().map_err(AppError::NotFound)?;
    Ok(Json(
        state
            .submissions()
            .save_kind(&user.owner_id, kind, form)
            .await?,
    ))
}
