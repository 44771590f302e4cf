// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! HTTP route handlers.

pub mod admin;
pub mod auth;
pub mod student;

use crate::middleware::{access_gate, require_admin, require_auth};
use crate::services::LiveStream;
use crate::AppState;
use axum::http::{header, Method};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::{middleware, routing::get, Json, Router};
use futures_util::{Stream, StreamExt};
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

#[derive(Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct HealthResponse {
    pub status: String,
    pub build_id: String,
}

/// Health check response
async fn health_check() -> Json<HealthResponse> {
    let build_id = option_env!("BUILD_ID").unwrap_or("unknown").to_string();
    Json(HealthResponse {
        status: "ok".to_string(),
        build_id,
    })
}

/// Turn a live snapshot stream into SSE `snapshot` events.
///
/// The live subscription is owned by the stream, so it is released when the
/// client disconnects and axum drops the response body.
pub(crate) fn snapshot_events<T, U, F>(
    stream: LiveStream<T>,
    shape: F,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>>
where
    T: Send + 'static,
    U: Serialize,
    F: Fn(Vec<T>) -> U + Send + 'static,
{
    let events = stream.map(move |snapshot| {
        let event = snapshot.map_err(|e| e.to_string()).and_then(|items| {
            Event::default()
                .event("snapshot")
                .json_data(shape(items))
                .map_err(|e| e.to_string())
        });
        Ok(event.unwrap_or_else(|e| {
            tracing::error!(error = %e, "Live feed failed");
            Event::default().event("error").data("live feed failed")
        }))
    });
    Sse::new(events).keep_alive(KeepAlive::default())
}

/// Build the complete router with all routes.
pub fn create_router(state: Arc<AppState>) -> Router {
    // CORS layer - allow requests from frontend URL and localhost (for dev)
    let frontend_url = state.config.frontend_url.clone();
    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::AllowOrigin::predicate(
            move |origin: &axum::http::HeaderValue, _request_parts: &axum::http::request::Parts| {
                let origin_str = origin.to_str().unwrap_or("");
                origin_str == frontend_url
                    || origin_str.starts_with("http://localhost")
                    || origin_str.starts_with("http://127.0.0.1")
            },
        ))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT]);

    // Session required
    let student_routes =
        student::routes().route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    // Signed admin pass required
    let admin_routes =
        admin::routes().route_layer(middleware::from_fn_with_state(state.clone(), require_admin));

    // Everything except the health check sits behind the access gate
    let gated_routes = Router::new()
        .merge(auth::routes())
        .merge(student_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(state.clone(), access_gate));

    Router::new()
        .route("/health", get(health_check))
        .merge(gated_routes)
        .layer(cors)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state)
}
