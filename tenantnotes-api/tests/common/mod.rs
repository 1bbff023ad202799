//! Common test utilities for API tests
//!
//! - Router construction with or without a live database
//! - Request helpers driving the router in-process
//!
//! Database-backed tests are skipped unless `DATABASE_URL` points at a Citus
//! coordinator.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tenantnotes_api::app::{build_router, AppState};
use tenantnotes_api::config::{ApiConfig, Config, DatabaseConfig, SessionConfig};
use tenantnotes_shared::db::pool::{create_pool, PoolConfig};
use tenantnotes_shared::db::provision::ensure_schema;
use tower::ServiceExt;

pub const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

pub fn test_config(database_url: &str) -> Config {
    Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_origins: vec!["*".to_string()],
        },
        database: DatabaseConfig {
            url: database_url.to_string(),
            max_connections: 5,
        },
        session: SessionConfig {
            secret: SECRET.to_string(),
            ttl_hours: 1,
        },
    }
}

/// Router whose pool never reaches a database
///
/// Enough for requests rejected before any query runs.
pub fn offline_app() -> Router {
    let url = "postgresql://nobody@127.0.0.1:1/offline";
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(500))
        .connect_lazy(url)
        .expect("Lazy pool should build");

    build_router(AppState::new(pool, test_config(url)))
}

/// Router over a provisioned test database, or `None` to skip
pub async fn live_app() -> Option<Router> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => url,
        _ => {
            eprintln!("DATABASE_URL not set, skipping database test");
            return None;
        }
    };

    let pool = create_pool(PoolConfig::new(url.clone()).with_max_connections(5))
        .await
        .expect("Failed to create pool");
    ensure_schema(&pool).await.expect("Failed to provision schema");

    Some(build_router(AppState::new(pool, test_config(&url))))
}

/// A name no other test run uses
pub fn unique(prefix: &str) -> String {
    format!("{}-{}", prefix, uuid::Uuid::new_v4().simple())
}

/// Sends a request and returns status plus JSON body (`Null` when empty)
pub async fn send(
    app: &Router,
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
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();

    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}
