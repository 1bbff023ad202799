/// Session identity codec
///
/// A user is identified by the composite key `(id, tenant_id)`; the local id
/// alone repeats across tenants. Sessions therefore carry both halves, encoded
/// as `"<id>:<tenant_id>"`:
///
/// ```text
/// "42:7"  ->  user 42 of tenant 7
/// ```
///
/// Decoding only checks the format. Whether the user still exists is decided
/// by [`resolve_session`], which reports a missing row as `None` rather than
/// as a decoding failure.
///
/// # Example
///
/// ```
/// use tenantnotes_shared::auth::session::SessionId;
///
/// let token = SessionId::new(42, 7).encode();
/// assert_eq!(token, "42:7");
///
/// let session = SessionId::decode(&token).unwrap();
/// assert_eq!((session.user_id, session.tenant_id), (42, 7));
///
/// assert!(SessionId::decode("42").is_err());
/// ```

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;

use crate::models::user::User;

/// Separator between the user id and the tenant id
pub const DELIMITER: char = ':';

/// Error type for session decoding
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Not exactly two integer parts
    #[error("Malformed session identifier")]
    Malformed,
}

/// Composite user identity carried by a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId {
    /// Local user id
    pub user_id: i32,

    /// Tenant the user belongs to
    pub tenant_id: i32,
}

impl SessionId {
    pub fn new(user_id: i32, tenant_id: i32) -> Self {
        Self { user_id, tenant_id }
    }

    /// Encodes as `"<user_id>:<tenant_id>"`
    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Parses `"<user_id>:<tenant_id>"`
    ///
    /// # Errors
    ///
    /// `DecodeError::Malformed` unless the token splits on the delimiter into
    /// exactly two parts that both parse as integers.
    pub fn decode(token: &str) -> Result<Self, DecodeError> {
        let mut parts = token.split(DELIMITER);

        let (Some(user_id), Some(tenant_id), None) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(DecodeError::Malformed);
        };

        let user_id = user_id.parse::<i32>().map_err(|_| DecodeError::Malformed)?;
        let tenant_id = tenant_id.parse::<i32>().map_err(|_| DecodeError::Malformed)?;

        Ok(Self { user_id, tenant_id })
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.user_id, DELIMITER, self.tenant_id)
    }
}

impl FromStr for SessionId {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

/// Resolves a session to a live user
///
/// Looks the user up by composite primary key, so the query is routed to the
/// shard of `tenant_id`. `None` means the session refers to no user and the
/// request should be treated as unauthenticated.
pub async fn resolve_session(pool: &PgPool, session: &SessionId) -> Result<Option<User>, sqlx::Error> {
    User::find_by_key(pool, session.user_id, session.tenant_id).await
}
