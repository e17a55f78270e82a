//! Common test utilities for integration tests
//!
//! Every test gets its own router over a fresh `MemoryStorage`, so tests
//! need no database and never share state:
//! - A company (`acme.com`) with one regular user
//! - JWT generation for any user
//! - A request helper returning status and parsed JSON body

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use ecocommute_api::app::{build_router, identity_chain, AppState};
use ecocommute_api::config::Config;
use ecocommute_shared::auth::jwt::{create_token, Claims, TokenType};
use ecocommute_shared::models::company::{Company, CreateCompany};
use ecocommute_shared::models::user::{CreateUser, User, UserRole};
use ecocommute_shared::storage::{MemoryStorage, Storage};
use serde_json::Value;
use std::sync::Arc;
use tower::Service as _;

pub const TEST_SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Test context containing all necessary resources
pub struct TestContext {
    pub storage: Arc<MemoryStorage>,
    pub app: axum::Router,
    pub company: Company,
    pub user: User,
    pub jwt_token: String,
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.jwt.secret = TEST_SECRET.to_string();
    config
}

impl TestContext {
    pub async fn new() -> Self {
        Self::with_config(test_config()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let storage = Arc::new(MemoryStorage::new());

        let company = storage
            .create_company(CreateCompany {
                name: "Acme".to_string(),
                domain: "acme.com".to_string(),
            })
            .await
            .unwrap();

        let user = storage
            .create_user(CreateUser {
                email: "rider@acme.com".to_string(),
                password_hash: String::new(),
                name: Some("Robin Rider".to_string()),
                company_id: Some(company.id),
                role: UserRole::User,
            })
            .await
            .unwrap();

        let jwt_token = token_for(&user);
        let identity = identity_chain(&config);
        let state = AppState::new(storage.clone(), config, identity);
        let app = build_router(state);

        TestContext {
            storage,
            app,
            company,
            user,
            jwt_token,
        }
    }

    /// Creates another user in the test company
    pub async fn add_user(&self, email: &str, role: UserRole) -> User {
        self.storage
            .create_user(CreateUser {
                email: email.to_string(),
                password_hash: String::new(),
                name: None,
                company_id: Some(self.company.id),
                role,
            })
            .await
            .unwrap()
    }

    /// Sends a request as the default user
    pub async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_as(Some(&self.jwt_token), method, uri, body).await
    }

    /// Sends a request with an optional bearer token
    pub async fn send_as(
        &self,
        token: Option<&str>,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(json) => request
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => request.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };

        (status, json)
    }
}

/// Access token for `user`
pub fn token_for(user: &User) -> String {
    let claims = Claims::new(user.id, user.company_id, TokenType::Access);
    create_token(&claims, TEST_SECRET).unwrap()
}
