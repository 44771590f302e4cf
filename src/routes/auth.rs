// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Session and admin gate endpoints that work without a session.

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use std::sync::Arc;

use crate::error::Result;
use crate::middleware::auth::clear_session_cookie;
use crate::middleware::gate::admin_login;
use crate::routes::student::{open_session, SessionResponse};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(sign_in))
        .route("/auth/logout", post(logout))
        .route("/admin/auth", post(admin_login))
}

/// Clear the session cookie. Sign-out at the identity provider is the
/// frontend's job.
async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, StatusCode) {
    let jar = jar.add(clear_session_cookie(&state.config.frontend_url));
    (jar, StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub id_token: String,
}

/// Exchange an identity-provider ID token for a portal session.
///
/// Creates the profile on first sign-in.
async fn sign_in(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<SignInRequest>,
) -> Result<(CookieJar, Json<SessionResponse>)> {
    let identity = state.identity.verify(&body.id_token).await?;
    open_session(&state, jar, identity.owner_id, identity.email).await
}
