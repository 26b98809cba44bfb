mod common;

use axum::http::{Method, StatusCode};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde_json::json;

use common::{TestApp, subject_of};
use hermes_types::api::Claims;

#[tokio::test]
async fn create_then_fetch_own_message() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    let id = app.create_message(&alice, "abcba", &[]).await;

    let (status, body) = app
        .send(Method::GET, &format!("/message/{}", id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["id"], id);
    assert_eq!(body["owner_id"], subject_of(&alice));
    assert_eq!(body["text"], "abcba");
    assert_eq!(body["palindrome"], true);
    assert_eq!(body["recipient_ids"], json!([]));
    assert!(body["created_at"].is_string());
}

#[tokio::test]
async fn non_palindrome_is_flagged_false() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    let id = app.create_message(&alice, "abcca", &[]).await;

    let (_, body) = app
        .send(Method::GET, &format!("/message/{}", id), Some(&alice), None)
        .await;
    assert_eq!(body["palindrome"], false);
}

#[tokio::test]
async fn missing_text_is_rejected() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    let (status, body) = app
        .send(Method::POST, "/message", Some(&alice), Some(json!({ "recipient_ids": [] })))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["field"], "text");
    assert_eq!(body["fields"][0]["tag"], "required");
}

#[tokio::test]
async fn unknown_recipient_is_rejected_and_nothing_is_stored() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    let (status, body) = app
        .send(
            Method::POST,
            "/message",
            Some(&alice),
            Some(json!({ "text": "hello", "recipient_ids": [4040] })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("4040"));

    let (_, list) = app.send(Method::GET, "/message", Some(&alice), None).await;
    assert_eq!(list["messages"], json!([]));
}

#[tokio::test]
async fn other_users_message_looks_nonexistent() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let id = app.create_message(&alice, "private", &[]).await;

    let (hidden_status, hidden) = app
        .send(Method::GET, &format!("/message/{}", id), Some(&bob), None)
        .await;
    let (missing_status, missing) = app
        .send(Method::GET, &format!("/message/{}", id + 1000), Some(&bob), None)
        .await;

    assert_eq!(hidden_status, StatusCode::NOT_FOUND);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
    assert_eq!(hidden, missing);

    let (_, list) = app.send(Method::GET, "/message", Some(&bob), None).await;
    assert_eq!(list["messages"], json!([]));
}

#[tokio::test]
async fn delete_of_foreign_or_missing_message_is_identical() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let id = app.create_message(&alice, "mine", &[]).await;

    let (foreign_status, foreign) = app
        .send(Method::DELETE, &format!("/message/{}", id), Some(&bob), None)
        .await;
    let (missing_status, missing) = app
        .send(Method::DELETE, &format!("/message/{}", id + 1000), Some(&bob), None)
        .await;

    assert_eq!(foreign_status, StatusCode::NOT_FOUND);
    assert_eq!(missing_status, StatusCode::NOT_FOUND);
    assert_eq!(foreign, missing);

    // Still there for the owner
    let (status, _) = app
        .send(Method::GET, &format!("/message/{}", id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn owner_deletes_message() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let id = app.create_message(&alice, "bye", &[]).await;

    let (status, body) = app
        .send(Method::DELETE, &format!("/message/{}", id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "result": "message deleted" }));

    let (status, _) = app
        .send(Method::GET, &format!("/message/{}", id), Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn edit_recomputes_palindrome_flag() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let id = app.create_message(&alice, "abc", &[]).await;

    let (_, before) = app
        .send(Method::GET, &format!("/message/{}", id), Some(&alice), None)
        .await;
    assert_eq!(before["palindrome"], false);

    let (status, after) = app
        .send(
            Method::PATCH,
            &format!("/message/{}", id),
            Some(&alice),
            Some(json!({ "text": "aba" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(after["text"], "aba");
    assert_eq!(after["palindrome"], true);
}

#[tokio::test]
async fn post_edit_replaces_recipients_wholesale() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let carol = app.register("carol").await;
    let (bob_id, carol_id) = (subject_of(&bob), subject_of(&carol));
    let id = app.create_message(&alice, "hi all", &[bob_id]).await;

    let (status, body) = app
        .send(
            Method::POST,
            &format!("/message/{}", id),
            Some(&alice),
            Some(json!({ "recipient_ids": [carol_id] })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["text"], "hi all");
    assert_eq!(body["recipient_ids"], json!([carol_id]));

    let (bob_status, _) = app
        .send(Method::GET, &format!("/message/{}", id), Some(&bob), None)
        .await;
    let (carol_status, _) = app
        .send(Method::GET, &format!("/message/{}", id), Some(&carol), None)
        .await;
    assert_eq!(bob_status, StatusCode::NOT_FOUND);
    assert_eq!(carol_status, StatusCode::OK);
}

#[tokio::test]
async fn empty_edit_is_rejected() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let id = app.create_message(&alice, "abc", &[]).await;

    let (status, body) = app
        .send(Method::PATCH, &format!("/message/{}", id), Some(&alice), Some(json!({})))
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["fields"][0]["tag"], "required_without");
}

#[tokio::test]
async fn recipient_can_read_but_not_mutate() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let bob = app.register("bob").await;
    let id = app.create_message(&alice, "for bob", &[subject_of(&bob)]).await;
    let bob_own = app.create_message(&bob, "bob's own", &[]).await;

    let (status, list) = app.send(Method::GET, "/message", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = list["messages"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![id, bob_own]);

    let (status, _) = app
        .send(Method::GET, &format!("/message/{}", id), Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (edit_status, _) = app
        .send(
            Method::PATCH,
            &format!("/message/{}", id),
            Some(&bob),
            Some(json!({ "text": "hijacked" })),
        )
        .await;
    let (delete_status, _) = app
        .send(Method::DELETE, &format!("/message/{}", id), Some(&bob), None)
        .await;
    assert_eq!(edit_status, StatusCode::NOT_FOUND);
    assert_eq!(delete_status, StatusCode::NOT_FOUND);

    let (_, body) = app
        .send(Method::GET, &format!("/message/{}", id), Some(&alice), None)
        .await;
    assert_eq!(body["text"], "for bob");
}

#[tokio::test]
async fn non_numeric_id_is_bad_request() {
    let app = TestApp::new();
    let alice = app.register("alice").await;

    let (status, _) = app.send(Method::GET, "/message/abc", Some(&alice), None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn message_routes_require_bearer() {
    let app = TestApp::new();

    let (status, body) = app.send(Method::GET, "/message", None, None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "missing bearer in header");
}

#[tokio::test]
async fn tampered_token_is_rejected() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let (signed, signature) = alice.rsplit_once('.').unwrap();
    let flipped = if signature.starts_with('A') { 'B' } else { 'A' };
    let tampered = format!("{}.{}{}", signed, flipped, &signature[1..]);

    let (status, body) = app.send(Method::GET, "/message", Some(&tampered), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "token is not valid");
}

#[tokio::test]
async fn hmac_signed_token_is_rejected() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: subject_of(&alice).to_string(),
        iat: now,
        exp: now + 3600,
    };
    let forged = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(common::PUBLIC_KEY),
    )
    .unwrap();

    let (status, body) = app.send(Method::GET, "/message", Some(&forged), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].as_str().unwrap().starts_with("unexpected signing method"));
}

#[tokio::test]
async fn token_signed_by_foreign_key_is_rejected() {
    let app = TestApp::new();
    let alice = app.register("alice").await;
    app.create_message(&alice, "secret", &[]).await;
    let now = Utc::now().timestamp() as usize;
    let claims = Claims {
        sub: subject_of(&alice).to_string(),
        iat: now,
        exp: now + 3600,
    };
    let forged = encode(
        &Header::new(Algorithm::ES256),
        &claims,
        &EncodingKey::from_ec_pem(common::OTHER_PRIVATE_KEY).unwrap(),
    )
    .unwrap();

    let (status, _) = app.send(Method::GET, "/message", Some(&forged), None).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
