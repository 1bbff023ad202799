/// API route handlers
///
/// - `health`: Health check endpoint
/// - `auth`: Registration and login
/// - `me`: Current user
/// - `notes`: The caller's notes

pub mod auth;
pub mod health;
pub mod me;
pub mod notes;
