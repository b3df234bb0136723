// src/testutil.rs
//! Test helpers: a scripted transport, token minting and sample records.

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::core::errors::ApiError;
use crate::core::transport::{HttpRequest, HttpResponse, Transport};
use crate::types::{Role, User};

#[derive(Serialize)]
struct TestClaims {
    sub: String,
    exp: i64,
    iat: i64,
    username: String,
    role: String,
}

/// HS256 token for user 42 / `jdoe` expiring `secs` from now (negative = past).
pub fn token_expiring_in(secs: i64) -> String {
    token_for(42, "jdoe", Role::JobSeeker, secs)
}

pub fn token_for(id: i64, username: &str, role: Role, secs: i64) -> String {
    let now = Utc::now().timestamp();
    let claims = TestClaims {
        sub: id.to_string(),
        exp: now + secs,
        iat: now,
        username: username.to_string(),
        role: role.as_str().to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("encode test token")
}

pub fn user_with_role(role: Role) -> User {
    User {
        id: 42,
        username: "jdoe".to_string(),
        email: "jdoe@example.test".to_string(),
        first_name: Some("Jane".to_string()),
        last_name: Some("Doe".to_string()),
        role,
        company_name: None,
        company_description: None,
        company_website: None,
        company_location: None,
        contact_phone: None,
    }
}

pub fn sample_user() -> User {
    user_with_role(Role::JobSeeker)
}

/// Answers requests from a FIFO of canned responses and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, ApiError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_raw(&self, status: u16, content_type: Option<&str>, body: &str) {
        let status_text = StatusCode::from_u16(status)
            .ok()
            .and_then(|code| code.canonical_reason())
            .unwrap_or("")
            .to_string();
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            status,
            status_text,
            content_type: content_type.map(str::to_string),
            body: body.to_string(),
        }));
    }

    pub fn push_json(&self, status: u16, body: Value) {
        self.push_raw(status, Some("application/json"), &body.to_string());
    }

    pub fn push_text(&self, status: u16, body: &str) {
        self.push_raw(status, Some("text/plain;charset=UTF-8"), body);
    }

    pub fn push_network_error(&self, message: &str) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Network(message.to_string())));
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let path = request.url.clone();
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::Network(format!("no scripted response for {}", path))))
    }
}
