// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use course_portal::config::Config;
use course_portal::db::{FirestoreStore, MemoryStore};
use course_portal::middleware::auth::create_session_token;
use course_portal::middleware::gate::{create_admin_token, ADMIN_GATE_COOKIE};
use course_portal::routes::create_router;
use course_portal::services::IdTokenVerifier;
use jsonwebtoken::{encode, Algorithm, DecodingKey, EncodingKey, Header};
use course_portal::AppState;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Key id the test identity provider signs with.
pub const TEST_KEY_ID: &str = "test-key";
const TEST_PRIVATE_KEY: &[u8] = include_bytes!("../fixtures/id_token_signing.pem");
const TEST_PUBLIC_KEY: &[u8] = include_bytes!("../fixtures/id_token_signing.pub.pem");

/// Check if emulator is available via environment variable.
#[allow(dead_code)]
pub fn emulator_available() -> bool {
    std::env::var("FIRESTORE_EMULATOR_HOST").is_ok()
}

/// Skip test with message if emulator not available.
#[macro_export]
macro_rules! require_emulator {
    () => {
        if !crate::common::emulator_available() {
            eprintln!("⚠️  Skipping: FIRESTORE_EMULATOR_HOST not set");
            return;
        }
    };
}

/// Create a Firestore store against the emulator.
#[allow(dead_code)]
pub async fn test_firestore() -> FirestoreStore {
    FirestoreStore::new("test-project", Duration::from_millis(100))
        .await
        .expect("Failed to connect to Firestore emulator")
}

/// Test app over a fresh in-memory store.
/// Returns the router, the shared state and the store for inspection.
#[allow(dead_code)]
pub fn create_test_app() -> (axum::Router, Arc<AppState>, MemoryStore) {
    create_test_app_with_config(Config::test_default())
}

#[allow(dead_code)]
pub fn create_test_app_with_config(config: Config) -> (axum::Router, Arc<AppState>, MemoryStore) {
    let memory = MemoryStore::new();
    let identity = IdTokenVerifier::new_with_static_key(
        &config,
        TEST_KEY_ID,
        DecodingKey::from_rsa_pem(TEST_PUBLIC_KEY).unwrap(),
    )
    .unwrap();
    let state = Arc::new(AppState::new(config, Arc::new(memory.clone()), identity));
    (create_router(state.clone()), state, memory)
}

/// Bearer header value for a session of `owner_id`.
#[allow(dead_code)]
pub fn bearer(state: &AppState, owner_id: &str) -> String {
    let token = create_session_token(
        owner_id,
        &format!("{owner_id}@example.com"),
        &state.config.session_signing_key,
    )
    .unwrap();
    format!("Bearer {token}")
}

/// ID token for `owner_id` as the identity provider would issue it for the
/// test project.
#[allow(dead_code)]
pub fn id_token(owner_id: &str, email: &str) -> String {
    id_token_for_project(owner_id, email, "test-project")
}

#[allow(dead_code)]
pub fn id_token_for_project(owner_id: &str, email: &str, project: &str) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = serde_json::json!({
        "iss": format!("https://securetoken.google.com/{project}"),
        "aud": project,
        "sub": owner_id,
        "email": email,
        "iat": now,
        "exp": now + 3600,
    });
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(TEST_KEY_ID.to_string());
    encode(
        &header,
        &claims,
        &EncodingKey::from_rsa_pem(TEST_PRIVATE_KEY).unwrap(),
    )
    .unwrap()
}

/// Cookie header value carrying a signed admin pass for the default test config.
#[allow(dead_code)]
pub fn admin_cookie() -> String {
    let token = create_admin_token(&Config::test_default().session_signing_key).unwrap();
    format!("{ADMIN_GATE_COOKIE}={token}")
}

/// Build a request with an optional JSON body.
#[allow(dead_code)]
pub fn json_request(method: &str, uri: &str, body: Option<serde_json::Value>) -> request::Builder {
    request::Builder {
        method: method.to_string(),
        uri: uri.to_string(),
        headers: Vec::new(),
        body,
    }
}

pub mod request {
    use super::*;

    /// Small request builder so tests read as method, path, headers, body.
    pub struct Builder {
        pub(super) method: String,
        pub(super) uri: String,
        pub(super) headers: Vec<(header::HeaderName, String)>,
        pub(super) body: Option<serde_json::Value>,
    }

    impl Builder {
        #[allow(dead_code)]
        pub fn header(mut self, name: header::HeaderName, value: impl Into<String>) -> Self {
            self.headers.push((name, value.into()));
            self
        }

        pub fn build(self) -> Request<Body> {
            let mut builder = Request::builder().method(self.method.as_str()).uri(self.uri);
            for (name, value) in self.headers {
                builder = builder.header(name, value);
            }
            match self.body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            }
        }
    }
}

/// Read a response body as JSON.
#[allow(dead_code)]
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// All `Set-Cookie` header values of a response.
#[allow(dead_code)]
pub fn set_cookie_headers(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}
