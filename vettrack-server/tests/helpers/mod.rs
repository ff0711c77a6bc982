//! Test Helper Utilities
//!
//! Builds a router over a temp-dir database and drives it with `oneshot`.
//! External APIs are replaced by small axum servers on 127.0.0.1:0.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt; // for `oneshot` method
use vettrack_common::config::ServiceConfig;
use vettrack_common::db::init_database;
use vettrack_server::{build_router, AppState};

pub const MULTIPART_BOUNDARY: &str = "vettrack-test-boundary";

/// Minimal PNG header; enough for MIME sniffing
pub const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
];

pub struct TestApp {
    pub dir: TempDir,
    pub state: AppState,
    pub app: Router,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    pub async fn with_config<F>(configure: F) -> Self
    where
        F: FnOnce(&mut ServiceConfig),
    {
        let dir = TempDir::new().unwrap();
        let mut config = ServiceConfig::with_root(dir.path());
        configure(&mut config);
        config.ensure_directories().unwrap();

        let pool = init_database(&config.database_path()).await.unwrap();
        let state = AppState::new(pool, config).unwrap();
        let app = build_router(state.clone());

        Self { dir, state, app }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("GET", uri, token, None)).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send(request("POST", uri, token, Some(body))).await
    }

    /// Register and log in; returns the session token
    pub async fn login_as(&self, email: &str) -> String {
        let (status, _) = self
            .post(
                "/api/signup",
                None,
                json!({
                    "full_name": "Test Owner",
                    "email": email,
                    "password": "secret-pass",
                    "confirm_password": "secret-pass",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "signup failed for {}", email);

        let (status, body) = self
            .post(
                "/api/login",
                None,
                json!({ "email": email, "password": "secret-pass" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed for {}", email);
        body["token"].as_str().unwrap().to_string()
    }

    /// Add a pet for the token's user; returns the pet id
    pub async fn add_pet(&self, token: &str, name: &str, species: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/add_pet",
                Some(token),
                json!({
                    "name": name,
                    "species": species,
                    "breed": "Mixed",
                    "age": 3,
                    "medical_notes": "Allergic to chicken",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "add_pet failed: {}", body);
        body["pet"]["id"].as_i64().unwrap()
    }
}

pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// One part of a multipart body
pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        bytes: &'a [u8],
    },
}

pub fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", MULTIPART_BOUNDARY).as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
                );
                body.extend_from_slice(value.as_bytes());
            }
            Part::File {
                name,
                file_name,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n",
                        name, file_name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", MULTIPART_BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, token: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", MULTIPART_BOUNDARY),
        )
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

/// Serve `router` on an ephemeral local port; returns its base URL
pub async fn spawn_mock(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

/// A `generateContent` response whose candidate text is `payload` as JSON
pub fn gemini_reply(payload: Value) -> Value {
    json!({
        "candidates": [{
            "content": { "parts": [{ "text": payload.to_string() }] }
        }]
    })
}
