#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::Duration;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use hermes_api::{AppStateInner, router};
use hermes_crypto::{PasswordScheme, TokenKeys};
use hermes_db::Database;

pub const PRIVATE_KEY: &[u8] = include_bytes!("../../../../testdata/es256_primary_private.pem");
pub const PUBLIC_KEY: &[u8] = include_bytes!("../../../../testdata/es256_primary_public.pem");
pub const OTHER_PRIVATE_KEY: &[u8] = include_bytes!("../../../../testdata/es256_other_private.pem");

pub struct TestApp {
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let db = Database::open_in_memory().expect("open in-memory db");
        let tokens = TokenKeys::from_pem(PRIVATE_KEY, PUBLIC_KEY, Duration::hours(1))
            .expect("load test keys");
        // Minimum Argon2 cost keeps the suite fast
        let passwords = PasswordScheme::new(b"test-pepper".to_vec(), 1, 8).expect("password scheme");

        let state = Arc::new(AppStateInner {
            db,
            tokens,
            passwords,
        });

        Self {
            router: router(state),
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        self.send_raw(request).await
    }

    pub async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, json)
    }

    /// Register `username` and return its access token.
    pub async fn register(&self, username: &str) -> String {
        let (status, body) = self
            .send(
                Method::POST,
                "/user",
                None,
                Some(serde_json::json!({ "username": username, "password": "password1234" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register {}: {}", username, body);
        body["access_token"].as_str().unwrap().to_string()
    }

    /// Create a message as `token`'s user and return its id.
    pub async fn create_message(&self, token: &str, text: &str, recipient_ids: &[i64]) -> i64 {
        let (status, body) = self
            .send(
                Method::POST,
                "/message",
                Some(token),
                Some(serde_json::json!({ "text": text, "recipient_ids": recipient_ids })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create message: {}", body);
        body["id"].as_i64().unwrap()
    }
}

/// User id carried in a token issued by the test app.
pub fn subject_of(token: &str) -> i64 {
    let data = jsonwebtoken::decode::<hermes_types::api::Claims>(
        token,
        &jsonwebtoken::DecodingKey::from_ec_pem(PUBLIC_KEY).unwrap(),
        &jsonwebtoken::Validation::new(jsonwebtoken::Algorithm::ES256),
    )
    .unwrap();
    data.claims.sub.parse().unwrap()
}
