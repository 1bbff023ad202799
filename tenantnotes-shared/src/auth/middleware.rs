/// Session authentication middleware for Axum
///
/// Reads a Bearer token from the `Authorization` header, verifies its
/// signature, decodes the session identity from `sub` and resolves it to a
/// live user. On success an [`AuthContext`] is inserted into the request
/// extensions.
///
/// Every way of being unauthenticated (no header, wrong scheme, bad
/// signature, expired token, malformed identity, user gone) answers 401.
/// Only a failing database answers 500.
///
/// # Example
///
/// ```no_run
/// use axum::{middleware, routing::get, Extension, Router};
/// use sqlx::PgPool;
/// use tenantnotes_shared::auth::middleware::{session_auth_middleware, AuthContext, SessionAuth};
///
/// async fn protected_handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("Hello, {}!", auth.username)
/// }
///
/// fn router(pool: PgPool) -> Router {
///     let auth = SessionAuth::new(pool, "your-session-secret");
///     Router::new()
///         .route("/protected", get(protected_handler))
///         .layer(middleware::from_fn_with_state(auth, session_auth_middleware))
/// }
/// ```

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use super::jwt::{validate_token, JwtError};
use super::session::{resolve_session, SessionId};
use crate::models::user::User;

/// Authenticated caller, added to request extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthContext {
    pub user_id: i32,

    pub tenant_id: i32,

    pub username: String,
}

impl AuthContext {
    /// Builds the context for a resolved user
    pub fn from_user(user: &User) -> Self {
        Self {
            user_id: user.id,
            tenant_id: user.tenant_id,
            username: user.username.clone(),
        }
    }

    /// Session identity of the caller
    pub fn session_id(&self) -> SessionId {
        SessionId::new(self.user_id, self.tenant_id)
    }
}

/// Error type for authentication middleware
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Missing credentials")]
    MissingCredentials,

    /// Authorization header is not a Bearer token
    #[error("{0}")]
    InvalidFormat(String),

    /// Token failed verification or carried a malformed identity
    #[error("{0}")]
    InvalidToken(String),

    /// Token is valid but its user no longer exists
    #[error("Unknown session")]
    UnknownSession,

    /// Database error
    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::DatabaseError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (error, message) = match self {
            AuthError::DatabaseError(msg) => {
                tracing::error!("Session lookup failed: {}", msg);
                ("internal_error", "An internal error occurred".to_string())
            }
            other => ("unauthorized", other.to_string()),
        };

        (status, Json(json!({ "error": error, "message": message }))).into_response()
    }
}

/// State shared by the session middleware
#[derive(Clone)]
pub struct SessionAuth {
    pool: PgPool,
    secret: Arc<str>,
}

impl SessionAuth {
    pub fn new(pool: PgPool, secret: impl AsRef<str>) -> Self {
        Self {
            pool,
            secret: Arc::from(secret.as_ref()),
        }
    }

    /// Turns a bearer token into the authenticated caller
    pub async fn authenticate(&self, token: &str) -> Result<AuthContext, AuthError> {
        let claims = validate_token(token, &self.secret).map_err(|e| match e {
            JwtError::Expired => AuthError::InvalidToken("Token expired".to_string()),
            JwtError::InvalidIssuer { .. } => AuthError::InvalidToken("Invalid issuer".to_string()),
            _ => AuthError::InvalidToken("Invalid token".to_string()),
        })?;

        let session = claims
            .session_id()
            .map_err(|e| AuthError::InvalidToken(e.to_string()))?;

        let user = resolve_session(&self.pool, &session)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?
            .ok_or(AuthError::UnknownSession)?;

        Ok(AuthContext::from_user(&user))
    }
}

/// Extracts the token from `Authorization: Bearer <token>`
pub fn bearer_token(req: &Request) -> Result<&str, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidFormat("Expected Bearer token".to_string()))
}

/// Session authentication middleware
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn session_auth_middleware(
    State(auth): State<SessionAuth>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(&req)?;
    let auth_context = auth.authenticate(token).await?;

    tracing::debug!(
        user_id = auth_context.user_id,
        tenant_id = auth_context.tenant_id,
        "Authenticated request"
    );

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_header(value: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/v1/me");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_extraction() {
        let req = request_with_header(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&req).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_bearer_token_missing_or_wrong_scheme() {
        assert!(matches!(
            bearer_token(&request_with_header(None)),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            bearer_token(&request_with_header(Some("Basic dXNlcjpwYXNz"))),
            Err(AuthError::InvalidFormat(_))
        ));
        assert!(matches!(
            bearer_token(&request_with_header(Some("Bearer   "))),
            Err(AuthError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_auth_error_into_response() {
        for err in [
            AuthError::MissingCredentials,
            AuthError::InvalidFormat("test".to_string()),
            AuthError::InvalidToken("test".to_string()),
            AuthError::UnknownSession,
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNAUTHORIZED);
        }

        let response = AuthError::DatabaseError("test".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_auth_context_session_id() {
        let context = AuthContext {
            user_id: 3,
            tenant_id: 9,
            username: "alice".to_string(),
        };
        assert_eq!(context.session_id().encode(), "3:9");
    }
}
