// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared-credential gates in front of the portal.
//!
//! The site gate is a deterrent for a closed course: its pass cookie is a
//! plain flag. The admin pass authorizes writes, so its cookie is a signed
//! token that only this server can mint.

use crate::config::GateCredentials;
use crate::error::{AppError, Result};
use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;

pub const ACCESS_GATE_COOKIE: &str = "basic_auth_passed";
pub const ADMIN_GATE_COOKIE: &str = "admin_password_passed";

const PASS_COOKIE_TTL_DAYS: i64 = 365;
const ADMIN_PASS_TTL_SECS: usize = 12 * 60 * 60;
const ADMIN_SCOPE: &str = "admin";

/// Claims of the admin pass token. Session tokens carry no `scope` and so
/// never decode as an admin pass.
#[derive(Debug, Serialize, Deserialize)]
struct AdminClaims {
    scope: String,
    iat: usize,
    exp: usize,
}

/// Mint a signed admin pass.
pub fn create_admin_token(signing_key: &[u8]) -> anyhow::Result<String> {
    let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;
    let claims = AdminClaims {
        scope: ADMIN_SCOPE.to_string(),
        iat: now,
        exp: now + ADMIN_PASS_TTL_SECS,
    };

    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(signing_key),
    )?)
}

/// Whether `token` is an unexpired admin pass signed with `signing_key`.
pub fn verify_admin_token(token: &str, signing_key: &[u8]) -> bool {
    let key = DecodingKey::from_secret(signing_key);
    match decode::<AdminClaims>(token, &key, &Validation::new(Algorithm::HS256)) {
        Ok(data) => data.claims.scope == ADMIN_SCOPE,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected admin pass");
            false
        }
    }
}

fn admin_cookie(token: String, frontend_url: &str) -> Cookie<'static> {
    Cookie::build((ADMIN_GATE_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(frontend_url.starts_with("https://"))
        .max_age(time::Duration::seconds(ADMIN_PASS_TTL_SECS as i64))
        .build()
}

fn pass_cookie() -> Cookie<'static> {
    Cookie::build((ACCESS_GATE_COOKIE, "true"))
        .path("/")
        .same_site(SameSite::Lax)
        .max_age(time::Duration::days(PASS_COOKIE_TTL_DAYS))
        .build()
}

fn has_pass(jar: &CookieJar) -> bool {
    jar.get(ACCESS_GATE_COOKIE).is_some_and(|c| c.value() == "true")
}

fn secret_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Split an `Authorization: Basic` header into user and password.
fn parse_basic(value: &str) -> Option<(String, String)> {
    let encoded = value.strip_prefix("Basic ")?;
    let decoded = BASE64.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, password) = decoded.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

fn credentials_match(expected: &GateCredentials, user: &str, password: &str) -> bool {
    // Evaluate both so timing does not reveal which one differed.
    let user_ok = secret_eq(&expected.username, user);
    let password_ok = secret_eq(&expected.password, password);
    user_ok & password_ok
}

fn challenge() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [
            (header::WWW_AUTHENTICATE, "Basic realm=\"Protected\""),
            (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
        ],
        "Authentication required",
    )
        .into_response()
}

/// Site-wide HTTP Basic gate. Passes on the pass cookie or on matching
/// credentials, in which case the pass cookie is set. Disabled when no
/// credentials are configured.
pub async fn access_gate(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Response {
    let Some(expected) = &state.config.access_gate else {
        return next.run(request).await;
    };
    if has_pass(&jar) {
        return next.run(request).await;
    }

    let supplied = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(parse_basic);

    match supplied {
        Some((user, password)) if credentials_match(expected, &user, &password) => {
            tracing::info!("Access gate passed");
            let response = next.run(request).await;
            (jar.add(pass_cookie()), response).into_response()
        }
        _ => challenge(),
    }
}

/// Requires a valid admin pass cookie on `/admin/api` routes.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    request: Request,
    next: Next,
) -> Result<Response> {
    let passed = jar
        .get(ADMIN_GATE_COOKIE)
        .is_some_and(|c| verify_admin_token(c.value(), &state.config.session_signing_key));
    if !passed {
        return Err(AppError::Forbidden);
    }
    Ok(next.run(request).await)
}

#[derive(Debug, Deserialize)]
pub struct AdminPassphrase {
    pub passphrase: String,
}

/// Exchange the admin passphrase for the admin pass cookie.
///
/// With no passphrase configured the admin area stays closed.
pub async fn admin_login(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Json(body): Json<AdminPassphrase>,
) -> Result<(CookieJar, StatusCode)> {
    let Some(expected) = state.config.admin_passphrase.as_deref() else {
        tracing::warn!("Admin login attempted but no passphrase is configured");
        return Err(AppError::Forbidden);
    };

    if !secret_eq(expected, &body.passphrase) {
        tracing::warn!("Admin login with wrong passphrase");
        return Err(AppError::Unauthorized);
    }

    let token = create_admin_token(&state.config.session_signing_key)?;
    tracing::info!("Admin gate passed");
    Ok((
        jar.add(admin_cookie(token, &state.config.frontend_url)),
        StatusCode::NO_CONTENT,
    ))
}
