//! Shared helpers for driving the router in-process.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, header};
use chat_gateway::auth::{Claims, TokenVerifier, VerifyError};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

pub const GOOD_TOKEN: &str = "good-token";

/// Accepts exactly [`GOOD_TOKEN`].
pub struct FakeVerifier;

#[async_trait]
impl TokenVerifier for FakeVerifier {
    async fn verify(&self, token: &str, audience: Option<&str>) -> Result<Claims, VerifyError> {
        if token != GOOD_TOKEN {
            return Err(VerifyError::Rejected(400));
        }
        let mut claims = Claims::new();
        claims.insert("sub".into(), json!("tester"));
        claims.insert("aud".into(), json!(audience));
        Ok(claims)
    }
}

pub fn chat_request(body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
