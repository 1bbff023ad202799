/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /v1/auth/register` - Register a user in a tenant (created on first use)
/// - `POST /v1/auth/login` - Verify credentials and issue a session token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use tenantnotes_shared::auth::{
    account::{self, RegisterAccount},
    jwt,
    password,
};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Tenant to join; created if it does not exist
    #[validate(length(min = 1, max = 100, message = "Tenant name must be 1 to 100 characters"))]
    pub tenant_name: String,

    #[validate(length(min = 1, max = 50, message = "Username must be 1 to 50 characters"))]
    pub username: String,

    #[validate(
        email(message = "Invalid email format"),
        length(max = 100, message = "Email must be at most 100 characters")
    )]
    pub email: String,

    /// Password (checked against the strength policy)
    pub password: String,
}

impl RegisterRequest {
    /// Trims surrounding whitespace from the identifying fields
    fn normalized(self) -> Self {
        Self {
            tenant_name: self.tenant_name.trim().to_string(),
            username: self.username.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
        }
    }
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user_id: i32,

    pub tenant_id: i32,

    pub username: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    pub password: String,

    /// Tenant to sign in to; without it the tenant is looked up from the email
    #[validate(length(min = 1, max = 100, message = "Tenant name must be 1 to 100 characters"))]
    pub tenant_name: Option<String>,
}

impl LoginRequest {
    /// Trims the email and tenant name the same way registration does
    fn normalized(self) -> Self {
        Self {
            email: self.email.trim().to_string(),
            password: self.password,
            tenant_name: self.tenant_name.map(|name| name.trim().to_string()),
        }
    }
}

/// Login response
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// Session identity, `"<user_id>:<tenant_id>"`
    pub session_token: String,

    /// Signed token carrying the session identity; send as `Bearer`
    pub access_token: String,

    pub tenant_id: i32,

    pub user_id: i32,
}

/// Register a new user
///
/// ```text
/// POST /v1/auth/register
/// Content-Type: application/json
///
/// {
///   "tenant_name": "Acme",
///   "username": "alice",
///   "email": "alice@acme.com",
///   "password": "correct horse battery"
/// }
/// ```
///
/// Response (`201 Created`):
///
/// ```json
/// { "user_id": 1, "tenant_id": 1, "username": "alice" }
/// ```
///
/// # Errors
///
/// - `409 Conflict`: username or email already taken in the tenant
/// - `422 Unprocessable Entity`: validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let req = req.normalized();
    req.validate()?;

    password::validate_password_strength(&req.password)
        .map_err(|e| ApiError::invalid_field("password", e))?;

    let (tenant, user) = account::register(
        &state.db,
        RegisterAccount {
            tenant_name: req.tenant_name,
            username: req.username,
            email: req.email,
            password: req.password,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            tenant_id: tenant.id,
            username: user.username,
        }),
    ))
}

/// Login
///
/// ```text
/// POST /v1/auth/login
/// Content-Type: application/json
///
/// {
///   "email": "alice@acme.com",
///   "password": "correct horse battery",
///   "tenant_name": "Acme"
/// }
/// ```
///
/// Response:
///
/// ```json
/// {
///   "session_token": "1:1",
///   "access_token": "eyJ...",
///   "tenant_id": 1,
///   "user_id": 1
/// }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: "Invalid email or password", whatever the cause
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let req = req.normalized();
    req.validate()?;

    let user = account::authenticate(
        &state.db,
        &req.email,
        &req.password,
        req.tenant_name.as_deref(),
    )
    .await?;

    let session = user.session_id();
    let access_token =
        jwt::issue_session_token(&session, state.session_secret(), state.config.session.ttl())?;

    tracing::info!(user_id = user.id, tenant_id = user.tenant_id, "User logged in");

    Ok(Json(LoginResponse {
        session_token: session.encode(),
        access_token,
        tenant_id: user.tenant_id,
        user_id: user.id,
    }))
}
