/// Signed session tokens
///
/// The session identity (`"<user_id>:<tenant_id>"`, see [`super::session`])
/// travels to clients as the `sub` claim of an HS256 JWT, so it cannot be
/// altered without the server secret.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: Configurable (default 24 hours)
/// - **Validation**: Signature, expiration, not-before and issuer checks
/// - **Secret Management**: Secrets should be at least 32 bytes (256 bits)
///
/// # Example
///
/// ```
/// use tenantnotes_shared::auth::jwt::{create_token, validate_token, Claims};
/// use tenantnotes_shared::auth::session::SessionId;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let session = SessionId::new(42, 7);
///
/// let token = create_token(&Claims::new(&session), "your-secret-key")?;
///
/// let claims = validate_token(&token, "your-secret-key")?;
/// assert_eq!(claims.sub, "42:7");
/// assert_eq!(claims.session_id()?, session);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use super::session::{DecodeError, SessionId};

/// Issuer claim stamped on every token
pub const ISSUER: &str = "tenantnotes";

/// Default session lifetime
pub fn default_expiration() -> Duration {
    Duration::hours(24)
}

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Failed to validate token
    #[error("Failed to validate token: {0}")]
    ValidationError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Invalid issuer
    #[error("Invalid issuer: expected {expected}")]
    InvalidIssuer { expected: String },
}

/// JWT claims structure
///
/// - `sub`: encoded session identity
/// - `iss`: always "tenantnotes"
/// - `iat` / `nbf` / `exp`: Unix timestamps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - encoded `SessionId`
    pub sub: String,

    /// Issuer
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,
}

impl Claims {
    /// Creates claims with the default expiration
    pub fn new(session: &SessionId) -> Self {
        let now = Utc::now();
        Self::expiring_at(session, now, now + default_expiration())
    }

    /// Creates claims expiring after `expires_in`
    ///
    /// # Example
    ///
    /// ```
    /// use tenantnotes_shared::auth::jwt::Claims;
    /// use tenantnotes_shared::auth::session::SessionId;
    /// use chrono::Duration;
    ///
    /// let claims = Claims::with_expiration(&SessionId::new(1, 1), Duration::hours(1)).unwrap();
    /// assert!(!claims.is_expired());
    /// ```
    ///
    /// # Errors
    ///
    /// `JwtError::CreateError` if the expiration falls outside the
    /// representable date range.
    pub fn with_expiration(session: &SessionId, expires_in: Duration) -> Result<Self, JwtError> {
        let now = Utc::now();
        let expiration = now.checked_add_signed(expires_in).ok_or_else(|| {
            JwtError::CreateError(format!(
                "Expiration {}s from now is out of range",
                expires_in.num_seconds()
            ))
        })?;

        Ok(Self::expiring_at(session, now, expiration))
    }

    fn expiring_at(session: &SessionId, now: DateTime<Utc>, expiration: DateTime<Utc>) -> Self {
        Self {
            sub: session.encode(),
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
        }
    }

    /// Decodes the session identity carried in `sub`
    pub fn session_id(&self) -> Result<SessionId, DecodeError> {
        SessionId::decode(&self.sub)
    }

    /// Checks if token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }
}

/// Signs claims with HS256
///
/// # Errors
///
/// Returns `JwtError::CreateError` if token creation fails
pub fn create_token(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Validates a token and returns its claims
///
/// Verifies the signature, expiration, not-before time and issuer. The
/// session identity inside is not decoded here.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    // expired means expired; no grace period
    validation.leeway = 0;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidIssuer => JwtError::InvalidIssuer {
            expected: ISSUER.to_string(),
        },
        _ => JwtError::ValidationError(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Issues a session token for a user identity
pub fn issue_session_token(
    session: &SessionId,
    secret: &str,
    expires_in: Duration,
) -> Result<String, JwtError> {
    create_token(&Claims::with_expiration(session, expires_in)?, secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    #[test]
    fn test_claims_creation() {
        let claims = Claims::new(&SessionId::new(42, 7));

        assert_eq!(claims.sub, "42:7");
        assert_eq!(claims.iss, ISSUER);
        assert!(!claims.is_expired());
        assert_eq!(claims.exp - claims.iat, default_expiration().num_seconds());
    }

    #[test]
    fn test_create_and_validate_token() {
        let session = SessionId::new(42, 7);
        let token = issue_session_token(&session, SECRET, Duration::hours(1)).unwrap();

        let validated = validate_token(&token, SECRET).expect("Should validate token");
        assert_eq!(validated.session_id().unwrap(), session);
    }

    #[test]
    fn test_validate_with_wrong_secret() {
        let token = create_token(&Claims::new(&SessionId::new(1, 1)), "secret1").unwrap();
        assert!(validate_token(&token, "wrong-secret").is_err());
    }

    #[test]
    fn test_validate_expired_token() {
        // Negative duration = already expired
        let claims =
            Claims::with_expiration(&SessionId::new(1, 1), Duration::seconds(-3600)).unwrap();
        assert!(claims.is_expired());

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(validate_token(&token, SECRET), Err(JwtError::Expired)));
    }

    #[test]
    fn test_expiration_out_of_range() {
        let session = SessionId::new(1, 1);

        assert!(matches!(
            Claims::with_expiration(&session, Duration::MAX),
            Err(JwtError::CreateError(_))
        ));
        assert!(matches!(
            issue_session_token(&session, SECRET, Duration::MAX),
            Err(JwtError::CreateError(_))
        ));

        // ~342,000 years, past chrono's maximum date
        let hours = Duration::try_hours(3_000_000_000).unwrap();
        assert!(issue_session_token(&session, SECRET, hours).is_err());
    }

    #[test]
    fn test_validate_wrong_issuer() {
        let mut claims = Claims::new(&SessionId::new(1, 1));
        claims.iss = "someone-else".to_string();

        let token = create_token(&claims, SECRET).unwrap();
        assert!(matches!(
            validate_token(&token, SECRET),
            Err(JwtError::InvalidIssuer { .. })
        ));
    }

    #[test]
    fn test_signed_but_malformed_subject() {
        let mut claims = Claims::new(&SessionId::new(1, 1));
        claims.sub = "not-a-session".to_string();

        let token = create_token(&claims, SECRET).unwrap();
        let validated = validate_token(&token, SECRET).unwrap();
        assert_eq!(validated.session_id(), Err(DecodeError::Malformed));
    }
}
