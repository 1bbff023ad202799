//! # TenantNotes Shared Library
//!
//! Data layer and authentication for the TenantNotes API: sharded schema
//! provisioning, tenant/user/note models and session handling.
//!
//! ## Module Organization
//!
//! - `db`: connection pool, shard registry and schema provisioning
//! - `models`: tenants, users and notes with their distribution metadata
//! - `auth`: session identity, tokens, passwords, account flows, middleware

pub mod auth;
pub mod db;
pub mod models;

/// Current version of the TenantNotes shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
