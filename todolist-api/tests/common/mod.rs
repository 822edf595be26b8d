//! Common test utilities for integration tests
//!
//! This module provides shared infrastructure for integration tests:
//! - A router backed by a fresh in-memory store
//! - Basic auth header construction
//! - Request helpers returning status, headers and decoded JSON

#![allow(dead_code)]

use axum::body::{to_bytes, Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use std::sync::Arc;
use todolist_api::app::{build_router, AppState};
use todolist_api::config::Config;
use todolist_shared::auth::password::{PasswordHasher, PasswordParams};
use todolist_shared::service::{TaskDeleteScope, TodoService};
use todolist_shared::store::memory::MemoryStore;
use tower::Service as _;

/// Deadline accepted by the API
pub const DEADLINE: &str = "2020-03-13 10:00";

/// Decoded response
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    /// Body as JSON (`Null` when empty)
    pub fn json(&self) -> Value {
        if self.body.is_empty() {
            return Value::Null;
        }
        serde_json::from_slice(&self.body).expect("response body is not JSON")
    }

    /// Body as UTF-8 text
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Test context containing all necessary resources
pub struct TestContext {
    pub app: Router,
    pub store: Arc<MemoryStore>,
}

impl TestContext {
    /// Creates a context where tasks may only be deleted by their owner
    pub fn new() -> anyhow::Result<Self> {
        Self::with_delete_scope(TaskDeleteScope::Owner)
    }

    /// Creates a context with an explicit task deletion scope
    pub fn with_delete_scope(scope: TaskDeleteScope) -> anyhow::Result<Self> {
        let scope = scope.to_string();
        let mut config = Config::from_lookup(|key| match key {
            "STORAGE_BACKEND" => Some("memory".to_string()),
            "TASK_DELETE_SCOPE" => Some(scope.clone()),
            _ => None,
        })?;

        // Keep hashing fast in tests
        config.password = PasswordParams {
            memory_kib: 1024,
            iterations: 1,
            parallelism: 1,
        };

        let store = Arc::new(MemoryStore::new(PasswordHasher::new(config.password)?));
        let service = TodoService::from_store(store.clone());
        let app = build_router(AppState::new(service, config));

        Ok(Self { app, store })
    }

    /// Sends a request; `credentials` become a Basic auth header
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        credentials: Option<(&str, &str)>,
        body: Option<Value>,
    ) -> TestResponse {
        let body = body.map(|value| value.to_string());
        self.send_raw(method, uri, credentials, body).await
    }

    /// Sends a request with a raw (possibly non-JSON) body
    pub async fn send_raw(
        &self,
        method: Method,
        uri: &str,
        credentials: Option<(&str, &str)>,
        body: Option<String>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);

        if let Some((login, password)) = credentials {
            builder = builder.header(header::AUTHORIZATION, basic_auth(login, password));
        }

        let body = match body {
            Some(text) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(text)
            }
            None => Body::empty(),
        };

        let response = self
            .app
            .clone()
            .call(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Registers a user and asserts success
    pub async fn signup(&self, login: &str, password: &str) {
        let response = self
            .send(
                Method::POST,
                "/create_user",
                None,
                Some(json!({"login": login, "password": password})),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
    }

    /// Creates a task for `login` and returns its JSON
    pub async fn create_task(&self, login: &str, password: &str, title: &str) -> Value {
        let response = self
            .send(
                Method::POST,
                "/create_task",
                Some((login, password)),
                Some(json!({
                    "title": title,
                    "description": "test description",
                    "deadline": DEADLINE
                })),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.text());
        response.json()["task"].clone()
    }
}

/// `Authorization` header value for Basic credentials
pub fn basic_auth(login: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", login, password)))
}
