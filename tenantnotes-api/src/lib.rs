//! # TenantNotes API Server Library
//!
//! Multi-tenant notes service on a Citus-sharded PostgreSQL cluster.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod routes;
