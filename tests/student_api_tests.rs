// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Student portal API tests over the in-memory store.

use axum::http::{header, StatusCode};
use course_portal::db::{collections, to_fields};
use serde_json::json;
use tower::ServiceExt;

mod common;
use common::{bearer, body_json, json_request, set_cookie_headers};

fn survey_body(season_id: &str) -> serde_json::Value {
    json!({
        "seasonId": season_id,
        "lastName": "Yamada",
        "firstName": "Hanako",
        "lastNameKana": "ヤマダ",
        "firstNameKana": "ハナコ",
        "typingSkillLevel": 2,
        "webSkill": "html_css",
        "programmingExp": "none",
        "aiServices": [],
        "projectExpect": "Build a portfolio"
    })
}

#[tokio::test]
async fn test_start_session_creates_profile_once() {
    let (app, state, memory) = common::create_test_app();
    let auth = bearer(&state, "u1");

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(
                json_request("POST", "/api/session", None)
                    .header(header::AUTHORIZATION, auth.clone())
                    .build(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie_headers(&response)
            .iter()
            .any(|c| c.starts_with("portal_session=")));

        let body = body_json(response).await;
        assert_eq!(body["profile"]["uid"], "u1");
        assert_eq!(body["profile"]["email"], "u1@example.com");
        assert_eq!(body["isAnswered"], false);
    }

    use course_portal::db::{DocumentStore, Query};
    let profiles = memory
        .query(collections::USER_INFO, &Query::new())
        .await
        .unwrap();
    assert_eq!(profiles.len(), 1);
}

#[tokio::test]
async fn test_survey_completes_profile() {
    let (app, state, memory) = common::create_test_app();
    let auth = bearer(&state, "u1");
    memory.insert_raw(
        collections::LECTURE_SEASONS,
        "s1",
        to_fields(&json!({ "name": "2025 Spring", "isActive": true })).unwrap(),
    );
    state
        .profiles()
        .ensure_profile("u1", "u1@example.com")
        .await
        .unwrap();

    let response = app
        .oneshot(
            json_request("PUT", "/api/profile/survey", Some(survey_body("s1")))
                .header(header::AUTHORIZATION, auth)
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["isAnswered"], true);
    assert_eq!(body["profile"]["seasonName"], "2025 Spring");
    assert_eq!(body["profile"]["typingSkillLevel"], 2);
}

#[tokio::test]
async fn test_survey_with_blank_field_is_rejected() {
    let (app, state, _) = common::create_test_app();
    state
        .profiles()
        .ensure_profile("u1", "u1@example.com")
        .await
        .unwrap();

    let mut body = survey_body("s1");
    body["firstNameKana"] = json!("   ");
    let response = app
        .oneshot(
            json_request("PUT", "/api/profile/survey", Some(body))
                .header(header::AUTHORIZATION, bearer(&state, "u1"))
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "validation_failed");
    let details = body["details"].as_str().unwrap().to_lowercase().replace('_', "");
    assert!(details.contains("firstnamekana"), "{details}");
}

#[tokio::test]
async fn test_survey_rejects_inactive_season() {
    let (app, state, memory) = common::create_test_app();
    memory.insert_raw(
        collections::LECTURE_SEASONS,
        "closed",
        to_fields(&json!({ "name": "2023 Autumn", "isActive": false })).unwrap(),
    );
    state
        .profiles()
        .ensure_profile("u1", "u1@example.com")
        .await
        .unwrap();

    let response = app
        .clone()
        .oneshot(
            json_request("PUT", "/api/profile/survey", Some(survey_body("closed")))
                .header(header::AUTHORIZATION, bearer(&state, "u1"))
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = app
        .oneshot(
            json_request("GET", "/api/profile", None)
                .header(header::AUTHORIZATION, bearer(&state, "u1"))
                .build(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert!(body["profile"]["seasonId"].is_null());
    assert_eq!(body["isAnswered"], false);
}

#[tokio::test]
async fn test_reflection_without_profile_is_not_found() {
    let (app, state, _) = common::create_test_app();

    let response = app
        .oneshot(
            json_request(
                "PUT",
                "/api/profile/reflection",
                Some(json!({ "impression": "Great", "good": "", "improve": "" })),
            )
            .header(header::AUTHORIZATION, bearer(&state, "ghost"))
            .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_notice_feed_follows_profile_season() {
    let (app, state, memory) = common::create_test_app();
    state
        .profiles()
        .create_profile("u1", "u1@example.com", Some("s1"), Default::default())
        .await
        .unwrap();
    for (id, season, publish, order) in [
        ("n1", "s1", true, 1),
        ("n2", "s1", true, 3),
        ("n3", "s1", false, 5),
        ("n4", "s2", true, 9),
    ] {
        memory.insert_raw(
            collections::NOTICES,
            id,
            to_fields(&json!({
                "seasonId": season,
                "title": id,
                "isPublish": publish,
                "orderId": order
            }))
            .unwrap(),
        );
    }

    let response = app
        .oneshot(
            json_request("GET", "/api/notices", None)
                .header(header::AUTHORIZATION, bearer(&state, "u1"))
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let ids: Vec<&str> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["n2", "n1"]);
}

#[tokio::test]
async fn test_documents_reject_unknown_type() {
    let (app, state, _) = common::create_test_app();

    let response = app
        .clone()
        .oneshot(
            json_request("GET", "/api/documents/9", None)
                .header(header::AUTHORIZATION, bearer(&state, "u1"))
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .oneshot(
            json_request("GET", "/api/documents/2", None)
                .header(header::AUTHORIZATION, bearer(&state, "u1"))
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!([]));
}

#[tokio::test]
async fn test_submission_save_then_read_latest() {
    let (app, state, _) = common::create_test_app();
    let auth = bearer(&state, "u1");

    let response = app
        .clone()
        .oneshot(
            json_request(
                "PUT",
                "/api/submissions/original-site",
                Some(json!({ "keyFeature": "Search", "sourceCode": "<main></main>" })),
            )
            .header(header::AUTHORIZATION, auth.clone())
            .build(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let saved = body_json(response).await;
    assert_eq!(saved["studentId"], "u1");

    let response = app
        .oneshot(
            json_request("GET", "/api/submissions", None)
                .header(header::AUTHORIZATION, auth)
                .build(),
        )
        .await
        .unwrap();
    let latest = body_json(response).await;
    assert_eq!(latest["originalSite"]["id"], saved["id"]);
    assert_eq!(latest["originalSite"]["keyFeature"], "Search");
    assert!(latest["originalPlay"].is_null());
    assert!(latest["quiz"].is_null());
}

#[tokio::test]
async fn test_unknown_submission_kind_is_not_found() {
    let (app, state, _) = common::create_test_app();

    let response = app
        .oneshot(
            json_request("PUT", "/api/submissions/essay", Some(json!({})))
                .header(header::AUTHORIZATION, bearer(&state, "u1"))
                .build(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_student_chat_round_trip() {
    let (app, state, _) = common::create_test_app();
    let auth = bearer(&state, "u1");

    let response = app
        .clone()
        .oneshot(
            json_request("POST", "/api/chat", Some(json!({ "message": "  Question?  " })))
                .header(header::AUTHORIZATION, auth.clone())
                .build(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let sent = body_json(response).await;
    assert_eq!(sent["message"], "Question?");
    assert_eq!(sent["senderRole"], "student");

    let response = app
        .oneshot(
            json_request("GET", "/api/chat", None)
                .header(header::AUTHORIZATION, auth)
                .build(),
        )
        .await
        .unwrap();
    let thread = body_json(response).await;
    assert_eq!(thread.as_array().unwrap().len(), 1);
}
